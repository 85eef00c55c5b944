/// Run-length form of a per-node CPU count array.
///
/// For `cpus = [4, 4, 2, 2, 2, 2, 2, 2]` the runs are `values = [4, 2]` and
/// `reps = [2, 6]`. Always derived from `cpus` with [`CpuArray::compact`];
/// never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuArray {
    values: Vec<u16>,
    reps: Vec<u32>,
}

impl CpuArray {
    pub fn compact(cpus: &[u16]) -> Self {
        let mut array = Self::default();

        for &cpu_count in cpus {
            if array.values.last() == Some(&cpu_count) {
                if let Some(reps) = array.reps.last_mut() {
                    *reps += 1;
                }
            } else {
                array.values.push(cpu_count);
                array.reps.push(1);
            }
        }

        array
    }

    pub fn expand(&self) -> Vec<u16> {
        self.values.iter().zip(&self.reps).flat_map(|(&value, &reps)| std::iter::repeat_n(value, reps as usize)).collect()
    }

    pub fn cnt(&self) -> u32 {
        self.values.len() as u32
    }

    pub fn values(&self) -> &[u16] {
        &self.values
    }

    pub fn reps(&self) -> &[u32] {
        &self.reps
    }

    /// CPU count of `node` without expanding the whole array.
    pub fn cpus_on_node(&self, node: usize) -> Option<u16> {
        let mut first = 0usize;
        for (&value, &reps) in self.values.iter().zip(&self.reps) {
            first += reps as usize;
            if node < first {
                return Some(value);
            }
        }
        None
    }
}

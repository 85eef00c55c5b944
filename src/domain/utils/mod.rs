pub mod bit_fmt;
pub mod hostlist;

pub mod defined_memory;
pub mod privatization;

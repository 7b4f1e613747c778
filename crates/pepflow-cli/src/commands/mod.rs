pub mod assemble;
pub mod dock;
pub mod minimize;
pub mod prepare;
pub mod protonate;

pub mod code_sweep;

pub use code_sweep::CodeSweepWorker;

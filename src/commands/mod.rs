mod capture;
mod inspect;

pub use capture::run_capture;
pub use inspect::run_inspect;

mod example;
mod random;

pub use example::{ExampleError, ExampleService, UnexpectedError};
pub use random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};

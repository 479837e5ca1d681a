pub mod checkpoint;
pub mod demographics;
pub mod llm;
pub mod processor;
pub mod records;
pub mod storage;
pub mod summary;
pub mod transcript;
pub mod youtube;

pub use checkpoint::*;
pub use demographics::*;
pub use processor::*;
pub use records::*;
pub use storage::*;
pub use summary::*;
pub use transcript::*;
pub use youtube::*;

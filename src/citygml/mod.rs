pub mod event;
pub mod extractor;
pub mod loader;
pub mod stream;
pub mod surface;
pub mod tokenizer;

pub use event::{EventSink, ParseEvent};
pub use extractor::{ExtractionContext, ExtractionStats, NumericPolicy, ParserState};
pub use loader::{DocumentLoader, LoadStatus, Progress, load_str};
pub use stream::{DocumentStream, StreamMessage};
pub use tokenizer::XmlTokenizer;

pub mod external;
pub mod format;
pub mod parameter_file;

pub use external::{ExternalEvaluator, read_result};
pub use format::{format_general, format_value};
pub use parameter_file::ParameterFileWriter;

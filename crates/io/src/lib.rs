// File I/O operations

pub mod csv;
pub mod load;
pub mod report;
pub mod sink;
pub mod xlsx;

pub use load::load_table;
pub use report::{render_report, RenderError, RenderOptions, RenderedReport};
pub use sink::{CsvResultSink, JsonResultSink};

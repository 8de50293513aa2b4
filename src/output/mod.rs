pub mod formatters;

pub use formatters::{
    CsvFormatter, DataFormatter, DecimalFormatter, HexFormatter, JsonFormatter, OutputFormat,
    RegisterReading,
};

pub mod ifc;
pub mod step;

pub use crate::error::ParseError;
pub use ifc::{parse_chunked, parse_ifc, parse_ifc_file, IfcModel, IfcParser, ParsePhase, ParseProgress, ParseStatus};
pub use step::{decode_step_string, RawStepRecord, StepValue};

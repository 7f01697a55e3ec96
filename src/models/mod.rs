pub mod fleet;
pub mod operator;
pub mod records;

pub use fleet::{Company, Vehicle, WorkItem};
pub use operator::{Operator, OperatorRole};
pub use records::{
    ChannelReading, DoneRecord, MergedItem, NewRecord, RecordForm, TurnstileRecord,
};

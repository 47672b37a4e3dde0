pub type Tick = u16;
pub type SequenceNumber = u16;

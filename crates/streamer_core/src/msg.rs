#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// One classified line of extraction output.
    Output(crate::ProgressSignal),
    /// The extraction process is gone; every open track must become terminal.
    OutputEnded,
}

/// Activation record of one script function.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallFrame {
    /// Unit-local index of the running function
    pub function: u16,
    /// Offset of the next instruction
    pub ip: usize,
    /// Stack index of the first argument
    pub base_pointer: usize,
}

impl CallFrame {
    pub fn new(function: u16, base_pointer: usize) -> Self {
        Self {
            function,
            ip: 0,
            base_pointer,
        }
    }
}

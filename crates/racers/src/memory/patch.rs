/// An ordered multi-step write, applied with
/// [`AddressSpace::apply_patch`](super::AddressSpace::apply_patch).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    steps: Vec<(u32, Vec<u8>)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(mut self, address: u32, bytes: impl Into<Vec<u8>>) -> Self {
        self.steps.push((address, bytes.into()));
        self
    }

    pub fn push(&mut self, address: u32, bytes: impl Into<Vec<u8>>) {
        self.steps.push((address, bytes.into()));
    }

    pub fn steps(&self) -> &[(u32, Vec<u8>)] {
        &self.steps
    }
}

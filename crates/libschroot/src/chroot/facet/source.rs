//! Marker facet identifying the writable source branch of a
//! snapshot-backed chroot.

use std::any::Any;

use super::Facet;

pub const FACET_NAME: &str = "source";

#[derive(Debug, Clone, Default)]
pub struct Source;

impl Source {
    pub fn new() -> Self {
        Self
    }
}

impl Facet for Source {
    fn name(&self) -> &'static str {
        FACET_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! Builtin features.

use std::rc::Rc;

use crate::feature::Feature;

pub mod format;
pub mod git;
pub mod make;
pub mod python;
pub mod yapf;

pub use format::{FormatConfig, FormatFeature};
pub use git::{GitConfig, GitFeature};
pub use make::{MakeConfig, MakeFeature};
pub use python::{PythonConfig, PythonFeature};
pub use yapf::YapfFeature;

/// Every builtin feature, in catalog order.
pub fn builtins() -> Vec<Rc<dyn Feature>> {
    vec![
        Rc::new(MakeFeature),
        Rc::new(GitFeature),
        Rc::new(PythonFeature),
        Rc::new(FormatFeature),
        Rc::new(YapfFeature),
    ]
}

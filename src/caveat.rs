use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};

use tracing::warn;

thread_local! {
    /// Caveats emitted on this thread since the last drain.
    static SINK: RefCell<Vec<Caveat>> = const { RefCell::new(Vec::new()) };
}

/// A non-fatal advisory raised when fingerprinting falls back to an
/// imprecise strategy.
///
/// Caveats never abort a computation. They indicate that the derived
/// identity is coarser than usual and may fail to distinguish calls that
/// differ in ways the fallback cannot see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caveat {
    /// A function was used as a parameter or watched value. Its identity is
    /// based on its structural description, not its runtime behavior, so two
    /// syntactically different but behaviorally identical functions get
    /// different identities.
    FunctionArgument {
        /// The function's type signature.
        signature: &'static str,
    },
    /// A value without structured identity handling was fingerprinted
    /// through its debug representation. Changes that do not alter that
    /// representation will not invalidate the cache.
    OpaqueValue {
        /// The value's type name.
        type_name: &'static str,
    },
}

impl Display for Caveat {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::FunctionArgument { signature } => write!(
                f,
                "a function of type `{signature}` is used as a parameter, \
                 which may cause mistakes when detecting whether there is a \
                 checkpoint for this call"
            ),
            Self::OpaqueValue { type_name } => write!(
                f,
                "a value of type `{type_name}` has no structured identity \
                 and falls back to its debug representation"
            ),
        }
    }
}

/// Record a caveat and log it.
pub(crate) fn emit(caveat: Caveat) {
    warn!("{caveat}");
    SINK.with(|sink| sink.borrow_mut().push(caveat));
}

/// Take all caveats recorded on this thread since the last drain.
pub fn drain_caveats() -> Vec<Caveat> {
    SINK.with(|sink| sink.take())
}

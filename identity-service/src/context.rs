use tokio_util::sync::CancellationToken;

use crate::error::{IdentityError, IdentityResult};

/// Cancellation scope handed to every repository and authentication call.
///
/// Checked once at entry; scans that have already started run to completion.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
}

impl OpContext {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A context nothing else holds a handle to, so it never cancels.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context cancelled together with `self`, that can also be cancelled alone.
    pub fn child(&self) -> Self {
        Self::new(self.token.child_token())
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn check(&self) -> IdentityResult<()> {
        if self.is_cancelled() {
            Err(IdentityError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_never_cancels() {
        assert!(OpContext::background().check().is_ok());
    }

    #[test]
    fn parent_cancellation_reaches_children() {
        let parent = OpContext::background();
        let child = parent.child();
        parent.cancel();
        assert!(matches!(child.check(), Err(IdentityError::Cancelled)));
    }

    #[test]
    fn child_cancellation_stays_local() {
        let parent = OpContext::background();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(parent.check().is_ok());
    }
}

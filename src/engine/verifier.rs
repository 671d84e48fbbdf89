//! Verifier capability: the seam between the search pipeline and a concrete container format.

use anyhow::Result;

/// Result of trying one candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The target accepted a credential; the value may be empty (no credential required).
    Match(String),
    NoMatch,
}

/// Per-worker verifier bound to one target. May carry mutable per-attempt state, so it is
/// owned by exactly one worker and never shared.
///
/// An `Err` from [`Verifier::try_candidate`] means "this candidate could not be checked"
/// (malformed entry, transient I/O); the pipeline counts it as tested and moves on.
pub trait Verifier: Send {
    fn try_candidate(&mut self, candidate: &str) -> Result<Verdict>;
}

/// Something that can be attacked: hands out independent verifiers.
///
/// `prepare` is called once per worker before any worker starts; a failure there is a
/// job-setup failure and aborts the run.
pub trait Target: Send + Sync {
    fn prepare(&self) -> Result<Box<dyn Verifier>>;

    /// Short human-readable name (file name for file-backed targets).
    fn describe(&self) -> String;
}

/// Verifier built from a closure. Handy for targets that need no per-worker state.
pub struct FnVerifier<F>(pub F);

impl<F> Verifier for FnVerifier<F>
where
    F: FnMut(&str) -> Result<Verdict> + Send,
{
    fn try_candidate(&mut self, candidate: &str) -> Result<Verdict> {
        (self.0)(candidate)
    }
}

/// Target whose verifiers are clones of one closure.
pub struct FnTarget<F> {
    name: String,
    check: F,
}

impl<F> FnTarget<F>
where
    F: Fn(&str) -> Result<Verdict> + Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Target for FnTarget<F>
where
    F: Fn(&str) -> Result<Verdict> + Clone + Send + Sync + 'static,
{
    fn prepare(&self) -> Result<Box<dyn Verifier>> {
        let check = self.check.clone();
        Ok(Box::new(FnVerifier(move |c: &str| check(c))))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

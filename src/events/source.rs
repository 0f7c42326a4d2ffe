use super::particle::Particle;

/// Sequential intake contract for event readers: file-backed datasets,
/// generators, adapters around other containers. The drivers only ever
/// consume this interface; parsing any particular format is the
/// implementer's business.
pub trait Source<const D: usize> {
    /// rewind to the first event
    fn reset(&mut self);
    /// advance to the next event, false once exhausted
    fn next(&mut self) -> bool;
    /// particles of the current event
    fn particles(&self) -> Vec<Particle<D>>;
    /// events yielded since the last reset
    fn accepted(&self) -> usize;
}

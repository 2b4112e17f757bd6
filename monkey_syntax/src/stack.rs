/// Remaining stack below which a new segment is allocated
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if it is close to running out.
/// Wrap every recursive step of the parser and evaluator in this,
/// so that deeply nested input does not overflow the host stack.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

use crate::value_objects::tick::Tick;

/// Pull-based tick producer for the streaming harness.
pub trait TickSource {
    fn next_tick(&mut self) -> Tick;
}

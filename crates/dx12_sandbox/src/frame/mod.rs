pub mod frame_slot;
pub mod frame_synchronizer;

pub use frame_slot::FrameSlot;
pub use frame_slot::SlotState;
pub use frame_synchronizer::FrameSynchronizer;

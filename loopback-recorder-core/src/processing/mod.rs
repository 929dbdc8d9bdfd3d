pub mod handoff_queue;
pub mod pause_gate;
pub mod sample_ring;
pub mod stop_signal;
pub mod wav_format;

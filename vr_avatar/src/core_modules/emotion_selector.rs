//! The process-wide "which face are we showing" cell.
//!
//! Written by remote control, by a classifier, or by a demo cycling through the
//! faces; read by the render loop once per tick. A single atomic keeps every
//! writer and the reader lock-free.

use crate::core_modules::emotion::{DetectedEmotion, EmotionId};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct EmotionSelector {
    current: AtomicU8,
}

impl EmotionSelector {
    pub fn new(initial: EmotionId) -> Self {
        Self {
            current: AtomicU8::new(initial as u8),
        }
    }

    pub fn get(&self) -> EmotionId {
        EmotionId::from_index(self.current.load(Ordering::Acquire) as usize).unwrap_or_default()
    }

    /// Replaces the current emotion, returning the previous one.
    pub fn set(&self, emotion: EmotionId) -> EmotionId {
        let previous = EmotionId::from_index(self.current.swap(emotion as u8, Ordering::AcqRel) as usize)
            .unwrap_or_default();
        if previous != emotion {
            info!("Avatar: {} -> {}", previous, emotion);
        }
        previous
    }

    /// Advances to the next emotion in cyclic order and returns it.
    pub fn next(&self) -> EmotionId {
        let mut observed = self.current.load(Ordering::Acquire);
        loop {
            let current = EmotionId::from_index(observed as usize).unwrap_or_default();
            let next = current.next();
            match self.current.compare_exchange_weak(
                observed,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    info!("Avatar: {} -> {}", current, next);
                    return next;
                }
                Err(actual) => observed = actual,
            }
        }
    }

    /// Shows whatever face best matches a classifier result. Results that carry no
    /// expression leave the current face alone.
    pub fn apply_detected(&self, detected: DetectedEmotion) -> EmotionId {
        if !detected.is_expression() {
            return self.get();
        }
        let emotion = detected.to_avatar();
        self.set(emotion);
        emotion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_neutral_and_cycles() {
        let selector = EmotionSelector::default();
        assert_eq!(selector.get(), EmotionId::Neutral);
        assert_eq!(selector.next(), EmotionId::Happy);
        assert_eq!(selector.get(), EmotionId::Happy);
    }

    #[test]
    fn set_returns_previous() {
        let selector = EmotionSelector::new(EmotionId::Sad);
        assert_eq!(selector.set(EmotionId::Angry), EmotionId::Sad);
        assert_eq!(selector.get(), EmotionId::Angry);
    }

    #[test]
    fn non_expressions_keep_current_face() {
        let selector = EmotionSelector::new(EmotionId::Happy);
        assert_eq!(selector.apply_detected(DetectedEmotion::None), EmotionId::Happy);
        assert_eq!(selector.apply_detected(DetectedEmotion::Disgusted), EmotionId::Angry);
        assert_eq!(selector.get(), EmotionId::Angry);
    }

    #[test]
    fn concurrent_next_never_loses_a_step() {
        let selector = Arc::new(EmotionSelector::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&selector);
                std::thread::spawn(move || {
                    for _ in 0..EmotionId::COUNT * 10 {
                        s.next();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 4 * 60 steps is a whole number of cycles.
        assert_eq!(selector.get(), EmotionId::Neutral);
    }
}

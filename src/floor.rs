use glam::Vec4;
use std::sync::{Arc, Mutex, PoisonError};

/// Latest floor clip plane reported by the sensor (`xyz` normal, `w` height)
///
/// The frame reader writes it from its own thread while the update loop
/// reads it; clones share one value.
#[derive(Clone, Debug, Default)]
pub struct FloorPlane {
    plane: Arc<Mutex<Vec4>>,
}

impl FloorPlane {
    pub fn new(plane: Vec4) -> Self {
        Self {
            plane: Arc::new(Mutex::new(plane)),
        }
    }

    /// Replace the stored plane
    pub fn set(&self, plane: Vec4) {
        // plain data, so a poisoned lock still holds a usable value
        let mut current = self.plane.lock().unwrap_or_else(PoisonError::into_inner);
        *current = plane;
    }

    /// Copy of the most recent plane (zero until the sensor reports one)
    pub fn get(&self) -> Vec4 {
        *self.plane.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_default_is_zero() {
        assert_eq!(FloorPlane::default().get(), Vec4::ZERO);
    }

    #[test]
    fn test_clones_share_value() {
        let reader = FloorPlane::default();
        let writer = reader.clone();
        writer.set(Vec4::new(0.0, 1.0, 0.0, 0.9));
        assert_eq!(reader.get(), Vec4::new(0.0, 1.0, 0.0, 0.9));
    }

    #[test]
    fn test_latest_value_across_threads() {
        let floor = FloorPlane::default();
        let producer = floor.clone();
        let handle = thread::spawn(move || {
            for i in 1..=100 {
                producer.set(Vec4::new(0.0, 1.0, 0.0, i as f32));
            }
        });
        handle.join().unwrap();
        assert_eq!(floor.get().w, 100.0);
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let floor = FloorPlane::new(Vec4::W);
        let poisoner = floor.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.plane.lock().unwrap();
            panic!("producer crashed");
        })
        .join();

        assert_eq!(floor.get(), Vec4::W);
        floor.set(Vec4::Y);
        assert_eq!(floor.get(), Vec4::Y);
    }
}

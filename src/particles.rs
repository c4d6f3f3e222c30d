//! Intensity-driven particle population with a fixed lifecycle:
//! spawned at the bottom edge, pushed by the beat signal, removed the same
//! tick they leave the visible bounds.

use rand::Rng;

use crate::audio::features::IntensitySample;

/// Overshoot tolerance past the canvas edges before a particle dies.
const EDGE_MARGIN: f32 = 10.0;
/// Particles a positive push always reaches, before scaling by intensity.
const PUSH_BASE_COUNT: usize = 50;
/// Additional pushed particles per unit of current intensity.
const PUSH_INTENSITY_SCALE: f32 = 150.0;
/// Upward speed multiplier while pushed; downward while falling back.
const PUSH_SPEED: f32 = 10.0;
const FALL_SPEED: f32 = 5.0;

#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub velocity: f32,
    pub alpha: f32,
    /// +1 while kicked upward by a beat, -1 while falling back.
    pub push_direction: i8,
    /// Intensity captured at the moment of the last push.
    pub intensity: f32,
}

impl Particle {
    fn is_dead(&self, height: f32) -> bool {
        self.y < -EDGE_MARGIN || self.y > height + EDGE_MARGIN
    }
}

/// Canvas bounds in display units.
#[derive(Clone, Copy, Debug)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

/// Owns the bounded particle population and advances it once per animation
/// tick. The RNG is injected so tests can seed it and assert statistical
/// bounds deterministically.
pub struct ParticleEngine<R: Rng> {
    particles: Vec<Particle>,
    bounds: Bounds,
    capacity: usize,
    rng: R,
}

impl<R: Rng> ParticleEngine<R> {
    pub fn new(bounds: Bounds, capacity: usize, rng: R) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            bounds,
            capacity,
            rng,
        }
    }

    /// Advance the population by one tick: spawn under capacity, apply the
    /// beat push, move everything, and reap anything out of bounds.
    pub fn tick(&mut self, intensity: IntensitySample) {
        self.spawn();
        self.apply_push(intensity);
        self.advance();
    }

    fn spawn(&mut self) {
        if self.particles.len() >= self.capacity {
            return;
        }
        self.particles.push(Particle {
            x: self.rng.random_range(0.0..self.bounds.width.max(1.0)),
            y: self.bounds.height,
            size: self.rng.random_range(1.0..3.0),
            velocity: 0.5,
            alpha: 1.0,
            push_direction: 1,
            intensity: 0.0,
        });
    }

    fn apply_push(&mut self, intensity: IntensitySample) {
        if self.particles.is_empty() {
            return;
        }

        if intensity.current > 0.5 * intensity.previous {
            // Rising beat: kick a bounded random subset upward. Stronger
            // beats reach more particles.
            let count = (PUSH_BASE_COUNT + (intensity.current * PUSH_INTENSITY_SCALE) as usize)
                .min(self.particles.len());

            // Partial Fisher-Yates over an index arena keeps the chosen
            // subset distinct.
            let mut indices: Vec<usize> = (0..self.particles.len()).collect();
            for i in 0..count {
                let j = self.rng.random_range(i..indices.len());
                indices.swap(i, j);
                let particle = &mut self.particles[indices[i]];
                particle.push_direction = 1;
                particle.intensity = intensity.current;
            }
        } else {
            // Falling energy: every particle decelerates and drops back.
            for particle in &mut self.particles {
                particle.push_direction = -1;
                particle.intensity = intensity.current;
            }
        }
    }

    fn advance(&mut self) {
        let height = self.bounds.height;
        let mut i = 0;
        while i < self.particles.len() {
            let particle = &mut self.particles[i];
            // A push moves particles toward the top of the canvas.
            let (direction, speed) = if particle.push_direction == 1 {
                (-1.0, particle.intensity * PUSH_SPEED)
            } else {
                (1.0, (1.0 - particle.intensity) * FALL_SPEED)
            };
            particle.y += direction * particle.velocity * speed;

            if particle.is_dead(height) {
                self.particles.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Read-only snapshot for renderers.
    #[allow(dead_code)]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Drop the whole population, e.g. on a canvas resize or track change.
    #[allow(dead_code)]
    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine(capacity: usize, seed: u64) -> ParticleEngine<StdRng> {
        ParticleEngine::new(
            Bounds {
                width: 800.0,
                height: 600.0,
            },
            capacity,
            StdRng::seed_from_u64(seed),
        )
    }

    fn beat(previous: f32, current: f32) -> IntensitySample {
        IntensitySample { previous, current }
    }

    #[test]
    fn population_never_exceeds_capacity() {
        let mut engine = engine(50, 1);
        for tick in 0..300 {
            let intensity = if tick % 3 == 0 {
                beat(0.1, 0.9)
            } else {
                beat(0.9, 0.1)
            };
            engine.tick(intensity);
            assert!(engine.len() <= 50);
        }
    }

    #[test]
    fn spawns_one_per_tick_under_capacity() {
        let mut engine = engine(200, 2);
        engine.tick(beat(0.0, 0.0));
        assert_eq!(engine.len(), 1);
        engine.tick(beat(0.0, 0.0));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn spawned_particles_sit_on_the_bottom_edge() {
        let mut engine = engine(10, 3);
        engine.tick(beat(1.0, 0.0)); // falling sweep, intensity 0
        let p = engine.particles()[0];
        assert!(p.x >= 0.0 && p.x < 800.0);
        assert!(p.size >= 1.0 && p.size < 3.0);
        // Fell back by 0.5 * 5.0 from the bottom edge.
        assert!((p.y - 602.5).abs() < 1e-4);
    }

    #[test]
    fn no_particle_outlives_leaving_the_bounds() {
        let mut engine = engine(100, 4);
        for tick in 0..500 {
            // Alternate hard kicks and full drops to churn the population.
            let intensity = if tick % 2 == 0 {
                beat(0.0, 1.0)
            } else {
                beat(1.0, 0.2)
            };
            engine.tick(intensity);
            for p in engine.particles() {
                assert!(!p.is_dead(600.0));
            }
        }
    }

    #[test]
    fn strong_beats_push_particles_upward() {
        let mut engine = engine(100, 5);
        // Fill the population with weak ticks first.
        for _ in 0..100 {
            engine.tick(beat(1.0, 0.4));
        }
        let mean = |e: &ParticleEngine<StdRng>| {
            e.particles().iter().map(|p| p.y).sum::<f32>() / e.len() as f32
        };
        let before = mean(&engine);
        engine.tick(beat(0.0, 1.0));
        let after = mean(&engine);
        assert!(after < before);
    }

    #[test]
    fn falling_sweep_affects_every_particle() {
        let mut engine = engine(100, 6);
        for _ in 0..60 {
            engine.tick(beat(0.0, 0.9));
        }
        engine.tick(beat(0.9, 0.2));
        assert!(engine
            .particles()
            .iter()
            .all(|p| p.push_direction == -1 && (p.intensity - 0.2).abs() < 1e-6));
    }

    #[test]
    fn seeded_engines_are_deterministic() {
        let mut a = engine(80, 7);
        let mut b = engine(80, 7);
        for _ in 0..100 {
            a.tick(beat(0.2, 0.8));
            b.tick(beat(0.2, 0.8));
        }
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.particles().iter().zip(b.particles()) {
            assert_eq!(pa.x, pb.x);
            assert_eq!(pa.y, pb.y);
        }
    }

    #[test]
    fn zero_capacity_spawns_nothing() {
        let mut engine = engine(0, 8);
        for _ in 0..10 {
            engine.tick(beat(0.0, 1.0));
        }
        assert!(engine.is_empty());
    }

    #[test]
    fn clear_empties_the_population() {
        let mut engine = engine(50, 9);
        for _ in 0..20 {
            engine.tick(beat(0.0, 0.5));
        }
        engine.clear();
        assert!(engine.is_empty());
    }
}

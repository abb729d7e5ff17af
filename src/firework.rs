// Copyright (c) 2026 rezky_nightky

use std::f32::consts::TAU;

use rand::{
    distr::{Distribution, Uniform},
    rngs::StdRng,
    Rng,
};

use crate::palette::Rgb;

/// Tuned physics constants are expressed per tick at a reference surface
/// height of 900 units; velocities and gravity scale linearly with the
/// actual surface height.
pub const REFERENCE_HEIGHT: f32 = 900.0;

const ASCENT_GRAVITY: f32 = 0.15;
const ASCENT_SPEED_LO: f32 = 10.0;
const ASCENT_SPEED_HI: f32 = 18.0;
const ASCENT_DRIFT: f32 = 0.35;

/// Horizontal overshoot allowed before an unexploded shell is culled,
/// as a fraction of surface width.
const SIDE_MARGIN: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellType {
    Peony,
    Willow,
    Chrysanthemum,
}

pub struct ShellPhysics {
    pub gravity: f32,
    pub drag: f32,
    pub decay: f32,
    pub burst_count: usize,
    pub speed_lo: f32,
    pub speed_hi: f32,
    pub trail_len: usize,
}

impl ShellType {
    pub const ALL: [ShellType; 3] = [
        ShellType::Peony,
        ShellType::Willow,
        ShellType::Chrysanthemum,
    ];

    pub fn physics(self) -> ShellPhysics {
        match self {
            ShellType::Peony => ShellPhysics {
                gravity: 0.08,
                drag: 0.98,
                decay: 0.015,
                burst_count: 80,
                speed_lo: 2.0,
                speed_hi: 8.0,
                trail_len: 0,
            },
            ShellType::Willow => ShellPhysics {
                gravity: 0.03,
                drag: 0.995,
                decay: 0.008,
                burst_count: 60,
                speed_lo: 1.5,
                speed_hi: 5.5,
                trail_len: 4,
            },
            ShellType::Chrysanthemum => ShellPhysics {
                gravity: 0.10,
                drag: 0.97,
                decay: 0.020,
                burst_count: 100,
                speed_lo: 2.5,
                speed_hi: 9.0,
                trail_len: 2,
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShellType::Peony => "peony",
            ShellType::Willow => "willow",
            ShellType::Chrysanthemum => "chrysanthemum",
        }
    }
}

/// Chrysanthemum shells scatter a second, smaller batch of slower
/// particles with an upward push.
const SECONDARY_COUNT: usize = 33;
const SECONDARY_SPEED_LO: f32 = 1.0;
const SECONDARY_SPEED_HI: f32 = 4.0;
const SECONDARY_LIFT: f32 = 0.3;

#[derive(Clone, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: f32,
    pub max_life: f32,
    pub color: Rgb,
    pub size: f32,
    pub shell: ShellType,
}

impl Particle {
    pub fn is_dead(&self) -> bool {
        self.life <= 0.0
    }

    /// One integration step: gravity into vy, drag on both components,
    /// position by velocity, life down by decay over the max-life scale.
    fn step(&mut self, scale: f32) {
        let p = self.shell.physics();
        self.vy += p.gravity * scale;
        self.vx *= p.drag;
        self.vy *= p.drag;
        self.x += self.vx;
        self.y += self.vy;
        self.life = (self.life - p.decay / self.max_life.max(0.001)).max(0.0);
    }
}

#[derive(Clone, Debug)]
pub struct Firework {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub target_y: f32,
    pub color: Rgb,
    pub exploded: bool,
    pub shell: ShellType,
    pub particles: Vec<Particle>,
}

impl Firework {
    /// Launches a shell from the bottom edge. `x` and `target_y` are
    /// picked by the scene; ascent speed and drift are randomized here.
    pub fn launch(
        x: f32,
        surface_h: f32,
        target_y: f32,
        color: Rgb,
        shell: ShellType,
        rng: &mut StdRng,
    ) -> Self {
        let scale = surface_h / REFERENCE_HEIGHT;
        let speed: f32 = rng.random_range(ASCENT_SPEED_LO..ASCENT_SPEED_HI);
        let drift: f32 = rng.random_range(-ASCENT_DRIFT..ASCENT_DRIFT);
        Self {
            x,
            y: surface_h,
            vx: drift * scale,
            vy: -speed * scale,
            target_y,
            color,
            exploded: false,
            shell,
            particles: Vec::new(),
        }
    }

    /// Advances the firework one tick and reports whether it should stay
    /// in the scene. Detonation and burst synthesis happen atomically
    /// within the tick that triggers them.
    pub fn step(
        &mut self,
        surface_w: f32,
        surface_h: f32,
        colors: &[Rgb],
        rng: &mut StdRng,
    ) -> bool {
        let scale = surface_h / REFERENCE_HEIGHT;

        if !self.exploded {
            self.vy += ASCENT_GRAVITY * scale;
            self.x += self.vx;
            self.y += self.vy;

            if self.y <= self.target_y || self.vy >= 0.0 {
                self.detonate(colors, scale, rng);
                return true;
            }

            let margin = surface_w * SIDE_MARGIN;
            return self.y > -margin && self.x > -margin && self.x < surface_w + margin;
        }

        for p in &mut self.particles {
            p.step(scale);
        }
        self.particles.retain(|p| !p.is_dead());

        !self.particles.is_empty()
    }

    fn detonate(&mut self, colors: &[Rgb], scale: f32, rng: &mut StdRng) {
        self.exploded = true;
        let shell = self.shell;
        let p = shell.physics();
        self.burst(
            p.burst_count,
            p.speed_lo * scale,
            p.speed_hi * scale,
            colors,
            rng,
            move |_vx, vy, speed| match shell {
                // Flatten the vertical component and push down so the
                // shell falls in long arcs.
                ShellType::Willow => vy * 0.35 + speed * 0.25,
                _ => vy,
            },
        );

        if self.shell == ShellType::Chrysanthemum {
            self.burst(
                SECONDARY_COUNT,
                SECONDARY_SPEED_LO * scale,
                SECONDARY_SPEED_HI * scale,
                colors,
                rng,
                |_vx, vy, speed| vy - speed * SECONDARY_LIFT,
            );
        }
    }

    fn burst(
        &mut self,
        count: usize,
        speed_lo: f32,
        speed_hi: f32,
        colors: &[Rgb],
        rng: &mut StdRng,
        shape_vy: impl Fn(f32, f32, f32) -> f32,
    ) {
        let count = count.max(1);
        let jitter = Uniform::new(-0.5, 0.5).expect("valid range");
        let speed_dist = Uniform::new(speed_lo, speed_hi.max(speed_lo + 0.001))
            .expect("valid range");
        let slot = TAU / count as f32;

        for i in 0..count {
            let angle = slot * i as f32 + jitter.sample(rng) * slot;
            let speed = speed_dist.sample(rng);
            let vx = angle.cos() * speed;
            let vy = angle.sin() * speed;
            let color = if colors.is_empty() {
                self.color
            } else {
                colors[rng.random_range(0..colors.len())]
            };

            self.particles.push(Particle {
                x: self.x,
                y: self.y,
                vx,
                vy: shape_vy(vx, vy, speed),
                life: 1.0,
                max_life: rng.random_range(0.5..1.0),
                color,
                size: rng.random_range(2.0..5.0),
                shell: self.shell,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    const W: f32 = 160.0;
    const H: f32 = 96.0;

    fn launched(rng: &mut StdRng) -> Firework {
        Firework::launch(W / 2.0, H, H * 0.4, (255, 0, 0), ShellType::Peony, rng)
    }

    #[test]
    fn unexploded_firework_owns_no_particles() {
        let mut rng = rng();
        let mut fw = launched(&mut rng);
        while !fw.exploded {
            assert!(fw.particles.is_empty());
            fw.step(W, H, &[(1, 2, 3)], &mut rng);
        }
        assert!(!fw.particles.is_empty());
    }

    #[test]
    fn exploded_is_a_one_way_latch() {
        let mut rng = rng();
        let mut fw = launched(&mut rng);
        for _ in 0..2000 {
            fw.step(W, H, &[(1, 2, 3)], &mut rng);
            if fw.exploded {
                break;
            }
        }
        assert!(fw.exploded);
        for _ in 0..50 {
            fw.step(W, H, &[(1, 2, 3)], &mut rng);
            assert!(fw.exploded);
        }
    }

    #[test]
    fn detonates_at_or_above_target_height() {
        let mut rng = rng();
        let mut fw = launched(&mut rng);
        while !fw.exploded {
            fw.step(W, H, &[(1, 2, 3)], &mut rng);
        }
        // Either it rose far enough or it stopped ascending.
        assert!(fw.y <= fw.target_y || fw.vy >= 0.0);
    }

    #[test]
    fn particle_life_is_monotonic_and_clamped() {
        let mut rng = rng();
        let mut fw = launched(&mut rng);
        while !fw.exploded {
            fw.step(W, H, &[(1, 2, 3)], &mut rng);
        }

        let mut prev: Vec<f32> = fw.particles.iter().map(|p| p.life).collect();
        for _ in 0..500 {
            for p in &mut fw.particles {
                p.step(H / REFERENCE_HEIGHT);
            }
            for (p, was) in fw.particles.iter().zip(&prev) {
                assert!(p.life <= *was);
                assert!(p.life >= 0.0);
            }
            prev = fw.particles.iter().map(|p| p.life).collect();
        }
    }

    #[test]
    fn dead_particles_are_evicted_same_tick() {
        let mut rng = rng();
        let mut fw = launched(&mut rng);
        loop {
            let alive = fw.step(W, H, &[(1, 2, 3)], &mut rng);
            assert!(fw.particles.iter().all(|p| p.life > 0.0));
            if !alive {
                break;
            }
        }
        assert!(fw.particles.is_empty());
    }

    #[test]
    fn burst_spacing_covers_the_full_circle() {
        let mut rng = rng();
        let mut fw = launched(&mut rng);
        while !fw.exploded {
            fw.step(W, H, &[(1, 2, 3)], &mut rng);
        }
        let (mut left, mut right, mut up, mut down) = (false, false, false, false);
        for p in &fw.particles {
            left |= p.vx < 0.0;
            right |= p.vx > 0.0;
            up |= p.vy < 0.0;
            down |= p.vy > 0.0;
        }
        assert!(left && right && up && down);
    }

    #[test]
    fn chrysanthemum_adds_secondary_scatter() {
        let mut rng = rng();
        let mut fw = Firework::launch(
            W / 2.0,
            H,
            H * 0.4,
            (255, 0, 0),
            ShellType::Chrysanthemum,
            &mut rng,
        );
        while !fw.exploded {
            fw.step(W, H, &[(1, 2, 3)], &mut rng);
        }
        let p = ShellType::Chrysanthemum.physics();
        assert_eq!(fw.particles.len(), p.burst_count + SECONDARY_COUNT);
    }
}

//! Rockfall early-warning scene.
//!
//! Rocks sit along a parabolic ridge, one per sampled site (two passes
//! over the sample). Every tick a resting rock may crack one level; at
//! the last level it raises an alert, pauses and shakes. One second
//! after an alert the villagers run out of their houses, and once all of
//! them have left the screen the paused rocks fall to the ground, each
//! landing filing a report line. The first landing shows a "Life Saved"
//! badge.
//!
//! Time advances in fixed ticks of 1/30 s. All randomness is drawn from
//! the caller's [`Rng`], so a seeded run replays exactly.

use log::{debug, info};
use rand::Rng;

use crate::dataset::SiteRecord;

/// Playfield width (the sidebar is drawn to the right of it).
pub const WIDTH: u32 = 1000;
/// Frame height.
pub const HEIGHT: u32 = 600;
/// Width of the report sidebar.
pub const SIDEBAR: u32 = 350;
/// Y coordinate rocks land on.
pub const GROUND: f64 = (HEIGHT - 70) as f64;
/// Rocks never spawn left of this (the legend lives there).
pub const LEFT_MARGIN: i32 = 150;

/// Simulation rate.
pub const TICKS_PER_SECOND: u64 = 30;

/// Ridge apex.
const PEAK_X: i32 = WIDTH as i32 / 2;
const PEAK_Y: i32 = 80;
/// Ridge height at `PEAK_X +- SPREAD`.
const BASE_Y: i32 = 180;
/// Horizontal half-width of the ridge.
const SPREAD: i32 = 400;

/// Per-tick chance that a resting rock cracks one more level.
pub const CRACK_PROBABILITY: f64 = 0.001;
/// Crack level at which a rock raises an alert.
pub const MAX_CRACK_LEVEL: u8 = 3;
/// Downward speed when a rock starts falling.
pub const INITIAL_FALL_SPEED: f64 = 4.0;
/// Speed added each tick while falling.
pub const GRAVITY: f64 = 0.4;
/// Shake displacement per tick while paused.
pub const SHAKE_STEP: f64 = 1.5;
/// Shake reverses once the offset exceeds this.
pub const SHAKE_LIMIT: f64 = 6.0;
/// Rock edge length range.
const ROCK_SIZE: std::ops::RangeInclusive<u32> = 30..=50;

/// House origins (top-left of the roof's bounding box).
pub const HOUSES: [(f64, f64); 3] = [
    (200.0, (HEIGHT - 170) as f64),
    (450.0, (HEIGHT - 170) as f64),
    (700.0, (HEIGHT - 170) as f64),
];
/// People per house.
const PEOPLE_PER_HOUSE: u32 = 3;
/// Horizontal running speed.
pub const PERSON_SPEED: f64 = 5.0;
/// Ticks between an alert and the evacuation.
pub const EVACUATION_DELAY_TICKS: u64 = TICKS_PER_SECOND;

/// Initial and per-tick growth of the "Life Saved" badge scale.
const LIFE_SAVED_START: f64 = 0.1;
const LIFE_SAVED_STEP: f64 = 0.05;

/// A crack segment in rock-local unit coordinates (`0..=1` on both axes).
pub type CrackLine = [f32; 4];

/// One rock on the ridge.
#[derive(Debug, Clone)]
pub struct Rock {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Current edge length; grows by one per tick up to `target_size`.
    pub size: u32,
    /// Final edge length.
    pub target_size: u32,
    /// Site this rock represents.
    pub site: SiteRecord,
    /// Number of cracks, `0..=MAX_CRACK_LEVEL`.
    pub crack_level: u8,
    /// Crack segments, one per level.
    pub cracks: Vec<CrackLine>,
    /// Released (possibly still paused for the evacuation).
    pub falling: bool,
    /// Held in place, shaking, until the village is empty.
    pub paused: bool,
    /// Downward speed.
    pub velocity: f64,
    /// Has landed and filed its report.
    pub warned: bool,
    /// Horizontal shake offset.
    pub shake_offset: f64,
    shake_dir: f64,
    /// Alert banner is up for this rock.
    pub alert_display: bool,
    /// Tick the alert was raised.
    pub alert_tick: Option<u64>,
}

impl Rock {
    fn spawn<R: Rng + ?Sized>(site: &SiteRecord, rng: &mut R) -> Self {
        let mut x = rng.gen_range(PEAK_X - SPREAD..=PEAK_X + SPREAD);
        if x < LEFT_MARGIN {
            x = LEFT_MARGIN + rng.gen_range(0..=SPREAD / 2);
        }
        Self {
            x: f64::from(x),
            y: f64::from(ridge_y(x)),
            size: 0,
            target_size: rng.gen_range(ROCK_SIZE),
            site: site.clone(),
            crack_level: 0,
            cracks: Vec::new(),
            falling: false,
            paused: false,
            velocity: 0.0,
            warned: false,
            shake_offset: 0.0,
            shake_dir: 1.0,
            alert_display: false,
            alert_tick: None,
        }
    }

    /// Rock is marked with the alert ring.
    #[must_use]
    pub const fn is_alerting(&self) -> bool {
        (self.falling || self.paused) && self.crack_level == MAX_CRACK_LEVEL
    }
}

/// Ridge height at `x`: `PEAK_Y + floor(a * (x - PEAK_X)^2)`.
fn ridge_y(x: i32) -> i32 {
    let dx = i64::from(x - PEAK_X);
    let rise = i64::from(BASE_Y - PEAK_Y) * dx * dx / i64::from(SPREAD * SPREAD);
    PEAK_Y + i32::try_from(rise).unwrap_or(i32::MAX - PEAK_Y)
}

/// One villager.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position of the head.
    pub y: f64,
    /// Running direction, `-1` or `+1`.
    pub dir: f64,
    /// Has started running.
    pub running: bool,
    /// Has left the playfield.
    pub escaped: bool,
}

/// The whole animation state.
#[derive(Debug, Clone)]
pub struct Scene {
    rocks: Vec<Rock>,
    people: Vec<Person>,
    reports: Vec<String>,
    life_saved_scale: Option<f64>,
    tick: u64,
}

impl Scene {
    /// Spawn two rocks per sampled site along the ridge.
    pub fn new<R: Rng + ?Sized>(sample: &[SiteRecord], rng: &mut R) -> Self {
        let mut rocks = Vec::with_capacity(sample.len() * 2);
        for _ in 0..2 {
            for site in sample {
                rocks.push(Rock::spawn(site, rng));
            }
        }
        info!("scene spawned {} rocks", rocks.len());
        Self {
            rocks,
            people: Vec::new(),
            reports: Vec::new(),
            life_saved_scale: None,
            tick: 0,
        }
    }

    /// Rocks in spawn order.
    #[must_use]
    pub fn rocks(&self) -> &[Rock] {
        &self.rocks
    }

    #[cfg(test)]
    pub(crate) fn rocks_mut(&mut self) -> &mut [Rock] {
        &mut self.rocks
    }

    /// Villagers, empty until the first evacuation.
    #[must_use]
    pub fn people(&self) -> &[Person] {
        &self.people
    }

    /// Every report filed so far, oldest first.
    #[must_use]
    pub fn reports(&self) -> &[String] {
        &self.reports
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Scale of the "Life Saved" badge, once shown.
    #[must_use]
    pub const fn life_saved_scale(&self) -> Option<f64> {
        self.life_saved_scale
    }

    /// Whether the alert banner is up.
    #[must_use]
    pub fn alert_active(&self) -> bool {
        self.rocks.iter().any(|r| r.alert_display)
    }

    /// Advance one tick. Returns the reports filed during this tick.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<String> {
        self.tick += 1;
        let mut filed = Vec::new();

        for rock in &mut self.rocks {
            if rock.size < rock.target_size {
                rock.size += 1;
            }
            if !rock.falling && rng.gen_bool(CRACK_PROBABILITY) && rock.crack_level < MAX_CRACK_LEVEL
            {
                rock.crack_level += 1;
                rock.cracks.push([
                    rng.gen_range(0.0..=1.0),
                    rng.gen_range(0.0..=1.0),
                    rng.gen_range(0.0..=1.0),
                    rng.gen_range(0.0..=1.0),
                ]);
            }
            if rock.crack_level == MAX_CRACK_LEVEL && !rock.falling && !rock.warned {
                rock.falling = true;
                rock.paused = true;
                rock.velocity = INITIAL_FALL_SPEED;
                rock.alert_display = true;
                rock.alert_tick = Some(self.tick);
                debug!("rock at location {} raised an alert", rock.site.location_id);
            }
            if rock.paused {
                rock.shake_offset += rock.shake_dir * SHAKE_STEP;
                if rock.shake_offset.abs() > SHAKE_LIMIT {
                    rock.shake_dir = -rock.shake_dir;
                }
            }
            if rock.falling && !rock.paused {
                rock.velocity += GRAVITY;
                rock.y += rock.velocity;
                if rock.y >= GROUND {
                    rock.y = GROUND;
                    rock.falling = false;
                    if !rock.warned {
                        rock.warned = true;
                        rock.alert_display = false;
                        filed.push(rock.site.rockfall_report());
                        if self.life_saved_scale.is_none() {
                            self.life_saved_scale = Some(LIFE_SAVED_START);
                        }
                    }
                }
            }
        }

        self.evacuate(rng);

        if let Some(scale) = &mut self.life_saved_scale {
            *scale = (*scale + LIFE_SAVED_STEP).min(1.0);
        }

        for report in &filed {
            info!("{report}");
        }
        self.reports.extend(filed.iter().cloned());
        filed
    }

    /// Start the evacuation once an alert is a second old, move the
    /// runners, and release paused rocks once everybody is out.
    fn evacuate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let tick = self.tick;
        let alert_due = self.alert_active()
            && self
                .rocks
                .iter()
                .any(|r| r.alert_tick.is_some_and(|t| tick - t >= EVACUATION_DELAY_TICKS));
        if alert_due {
            if self.people.is_empty() {
                self.people = spawn_people(rng);
                info!("evacuating {} people", self.people.len());
            }
            for person in &mut self.people {
                person.running = true;
            }
        }

        let mut all_escaped = true;
        for person in &mut self.people {
            if person.running && !person.escaped {
                person.x += person.dir * PERSON_SPEED;
                if !(0.0 < person.x && person.x < f64::from(WIDTH)) {
                    person.escaped = true;
                }
            }
            if !person.escaped {
                all_escaped = false;
            }
        }

        if all_escaped && !self.people.is_empty() {
            for rock in &mut self.rocks {
                rock.paused = false;
            }
        }
    }
}

fn spawn_people<R: Rng + ?Sized>(rng: &mut R) -> Vec<Person> {
    HOUSES
        .iter()
        .flat_map(|&(hx, hy)| {
            (0..PEOPLE_PER_HOUSE).map(move |j| (hx + 40.0 + f64::from(j) * 10.0, hy + 60.0))
        })
        .map(|(x, y)| Person {
            x,
            y,
            dir: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
            running: false,
            escaped: false,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use georoots_pipeline::AlertLevel;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn site(id: &str) -> SiteRecord {
        SiteRecord {
            alert_level: AlertLevel::High,
            region: "North".to_owned(),
            location_id: id.to_owned(),
            factor_of_safety: 0.876,
        }
    }

    /// Scene with one rock already at the last crack level.
    fn primed_scene(rng: &mut StdRng) -> Scene {
        let mut scene = Scene::new(&[site("A")], rng);
        scene.rocks.truncate(1);
        scene.rocks[0].crack_level = MAX_CRACK_LEVEL;
        scene
    }

    #[test]
    fn two_rocks_per_site_on_the_ridge() {
        let mut rng = StdRng::seed_from_u64(3);
        let sample: Vec<_> = (0..20).map(|i| site(&i.to_string())).collect();
        let scene = Scene::new(&sample, &mut rng);
        assert_eq!(scene.rocks().len(), 40);
        for rock in scene.rocks() {
            assert!(rock.x >= f64::from(LEFT_MARGIN));
            assert!(rock.x <= f64::from(PEAK_X + SPREAD));
            assert!(rock.y >= f64::from(PEAK_Y) && rock.y <= f64::from(BASE_Y));
            assert!(ROCK_SIZE.contains(&rock.target_size));
            assert_eq!(rock.size, 0);
        }
    }

    #[test]
    fn ridge_shape() {
        assert_eq!(ridge_y(PEAK_X), PEAK_Y);
        assert_eq!(ridge_y(PEAK_X - SPREAD), BASE_Y);
        assert_eq!(ridge_y(PEAK_X + SPREAD), BASE_Y);
        // 100 * 200^2 / 400^2 = 25
        assert_eq!(ridge_y(PEAK_X + 200), PEAK_Y + 25);
    }

    #[test]
    fn rocks_grow_one_unit_per_tick() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut scene = Scene::new(&[site("A")], &mut rng);
        scene.step(&mut rng);
        scene.step(&mut rng);
        assert!(scene.rocks().iter().all(|r| r.size == 2));
    }

    #[test]
    fn cracked_rock_alerts_and_shakes() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = primed_scene(&mut rng);
        scene.step(&mut rng);
        let rock = &scene.rocks()[0];
        assert!(rock.falling && rock.paused);
        assert!(rock.is_alerting());
        assert!((rock.velocity - INITIAL_FALL_SPEED).abs() < f64::EPSILON);
        assert_eq!(rock.alert_tick, Some(1));
        assert!((rock.shake_offset - SHAKE_STEP).abs() < f64::EPSILON);
        assert!(scene.alert_active());
    }

    #[test]
    fn shake_reverses_past_the_limit() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = primed_scene(&mut rng);
        let mut max_offset: f64 = 0.0;
        for _ in 0..20 {
            scene.step(&mut rng);
            max_offset = max_offset.max(scene.rocks()[0].shake_offset.abs());
        }
        assert!(max_offset <= SHAKE_LIMIT + SHAKE_STEP);
        assert!(max_offset > SHAKE_LIMIT);
    }

    #[test]
    fn people_leave_one_second_after_the_alert() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut scene = primed_scene(&mut rng);
        for _ in 0..EVACUATION_DELAY_TICKS {
            scene.step(&mut rng);
        }
        assert!(scene.people().is_empty());
        scene.step(&mut rng);
        assert_eq!(scene.people().len(), 9);
        assert!(scene.people().iter().all(|p| p.running));
    }

    #[test]
    fn rock_falls_after_evacuation_and_files_report() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut scene = primed_scene(&mut rng);
        let mut reports = Vec::new();
        for _ in 0..1000 {
            reports.extend(scene.step(&mut rng));
            if !reports.is_empty() {
                break;
            }
        }
        assert!(scene.people().iter().all(|p| p.escaped));
        assert_eq!(
            reports,
            ["Rockfall at Location A | Region: North | FoS: 0.88"]
        );
        let rock = &scene.rocks()[0];
        assert!((rock.y - GROUND).abs() < f64::EPSILON);
        assert!(rock.warned && !rock.falling && !rock.alert_display);
        assert!(!scene.alert_active());
        assert_eq!(scene.reports().len(), 1);
        assert!((scene.life_saved_scale().unwrap() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn life_saved_badge_grows_to_full_size() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut scene = primed_scene(&mut rng);
        for _ in 0..2000 {
            scene.step(&mut rng);
        }
        assert!((scene.life_saved_scale().unwrap() - 1.0).abs() < f64::EPSILON);
        assert_eq!(scene.reports().len(), 1);
    }

    #[test]
    fn falling_speed_follows_gravity() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut scene = primed_scene(&mut rng);
        scene.rocks[0].paused = false;
        scene.rocks[0].falling = true;
        scene.rocks[0].warned = false;
        scene.rocks[0].velocity = INITIAL_FALL_SPEED;
        scene.rocks[0].y = 0.0;
        // The crack check re-alerts only non-falling rocks.
        scene.step(&mut rng);
        let rock = &scene.rocks()[0];
        assert!((rock.velocity - (INITIAL_FALL_SPEED + GRAVITY)).abs() < 1e-12);
        assert!((rock.y - (INITIAL_FALL_SPEED + GRAVITY)).abs() < 1e-12);
    }

    #[test]
    fn seeded_runs_replay_exactly() {
        let sample: Vec<_> = (0..10).map(|i| site(&i.to_string())).collect();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut scene = Scene::new(&sample, &mut rng);
            for _ in 0..3000 {
                scene.step(&mut rng);
            }
            (
                scene.reports().to_vec(),
                scene.rocks().iter().map(|r| (r.x, r.y, r.crack_level)).collect::<Vec<_>>(),
            )
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn crack_levels_never_exceed_the_maximum() {
        let mut rng = StdRng::seed_from_u64(23);
        let sample: Vec<_> = (0..30).map(|i| site(&i.to_string())).collect();
        let mut scene = Scene::new(&sample, &mut rng);
        for _ in 0..5000 {
            scene.step(&mut rng);
        }
        for rock in scene.rocks() {
            assert!(rock.crack_level <= MAX_CRACK_LEVEL);
            assert_eq!(rock.cracks.len(), usize::from(rock.crack_level));
        }
    }
}

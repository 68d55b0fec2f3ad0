//! Randomized delay generators pacing session arrival and in-session
//! think time.

use std::time::Duration;

use anyhow::{Result, anyhow};
use rand::Rng;
use rand_distr::{Exp, Pareto};

/// Exponential inter-arrival process driving the orchestrator's spawn loop.
#[derive(Clone, Copy, Debug)]
pub struct ArrivalProcess {
    delay: Exp<f64>,
}

impl ArrivalProcess {
    /// Creates an arrival process targeting `load` session starts per second.
    pub fn new(load: f64) -> Result<Self> {
        let delay = Exp::new(load).map_err(|err| anyhow!("invalid arrival rate {load}: {err}"))?;
        Ok(Self { delay })
    }

    /// Draws the pause before the next session start.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(rng.sample(self.delay))
    }
}

/// Heavy-tailed pacing within a session.
///
/// Sessions currently issue exactly one request, so neither generator is
/// consulted by the session loop; the API is kept for multi-request sessions.
#[derive(Clone, Copy, Debug)]
pub struct Pacing {
    arrival: Pareto<f64>,
    think: Pareto<f64>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacing {
    /// Creates the generator pair with the standard traffic-model parameters.
    pub fn new() -> Self {
        Self {
            arrival: Pareto::new(1.0, 1.5).expect("valid Pareto parameters"),
            think: Pareto::new(5.0, 1.0).expect("valid Pareto parameters"),
        }
    }

    /// Draws the heavy-tailed pause between request bursts of one session.
    pub fn arrival_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(rng.sample(self.arrival))
    }

    /// Draws the think-time pause between consecutive requests of one
    /// session.
    pub fn think_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(rng.sample(self.think))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn arrival_delays_are_deterministic_per_seed() {
        let arrival = ArrivalProcess::new(5.0).unwrap();
        let mut a = SmallRng::seed_from_u64(1);
        let mut b = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(arrival.next_delay(&mut a), arrival.next_delay(&mut b));
        }
    }

    #[test]
    fn arrival_delays_match_the_configured_rate() {
        let arrival = ArrivalProcess::new(5.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(2);

        let samples = 10_000;
        let mean: f64 = (0..samples)
            .map(|_| arrival.next_delay(&mut rng).as_secs_f64())
            .sum::<f64>()
            / samples as f64;

        // Exponential with rate 5 has mean 0.2
        assert!((mean - 0.2).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(ArrivalProcess::new(0.0).is_err());
        assert!(ArrivalProcess::new(-1.0).is_err());
    }

    #[test]
    fn pareto_samples_respect_their_scale() {
        let pacing = Pacing::new();
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert!(pacing.arrival_delay(&mut rng) >= Duration::from_secs(1));
            assert!(pacing.think_time(&mut rng) >= Duration::from_secs(5));
        }
    }
}

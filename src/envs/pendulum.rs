use {
    super::{
        Environment,
        Step,
    },
    anyhow::{
        ensure,
        Result,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::f64::consts::PI,
};

/// Configuration for the classic torque-controlled pendulum.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendulumConfig {
    pub max_steps: usize,
    pub max_speed: f64,
    pub max_torque: f64,
    pub dt: f64,
    pub gravity: f64,
    pub mass: f64,
    pub length: f64,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            max_steps: 200,
            max_speed: 8.0,
            max_torque: 2.0,
            dt: 0.05,
            gravity: 10.0,
            mass: 1.0,
            length: 1.0,
        }
    }
}

/// The swing-up pendulum task with a continuous torque action.
///
/// Observations are `[cos(theta), sin(theta), theta_dot]` to avoid the
/// discontinuity of the raw angle. The reward penalizes the angle from
/// upright, the angular velocity and the applied torque, so it is always
/// non-positive. Episodes never terminate, they are truncated at
/// `max_steps`.
pub struct PendulumEnv {
    config: PendulumConfig,
    theta: f64,
    theta_dot: f64,
    steps: usize,
}

impl PendulumEnv {
    fn observation(&self) -> Vec<f64> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }

    fn angle_normalize(x: f64) -> f64 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl Environment for PendulumEnv {
    type Config = PendulumConfig;
    type Action = Vec<f64>;
    type Observation = Vec<f64>;

    fn config(&self) -> &PendulumConfig {
        &self.config
    }

    fn new(config: PendulumConfig) -> Result<Box<Self>> {
        ensure!(config.max_steps > 0, "pendulum needs a positive step limit");
        ensure!(
            config.max_torque > 0.0 && config.max_speed > 0.0,
            "pendulum torque and speed limits must be positive",
        );
        Ok(Box::new(Self {
            config,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
        }))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.theta = rng.gen_range(-PI..PI);
        self.theta_dot = rng.gen_range(-1.0..1.0);
        self.steps = 0;
        Ok(self.observation())
    }

    fn step(
        &mut self,
        action: Vec<f64>,
    ) -> Result<Step<Vec<f64>, Vec<f64>>> {
        ensure!(
            action.len() == 1,
            "pendulum takes a single torque, got {} values",
            action.len(),
        );
        let torque = action[0].clamp(-self.config.max_torque, self.config.max_torque);

        let reward = -(Self::angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2));

        // theta'' = 3g/(2l) * sin(theta) + 3/(ml^2) * u
        let (gravity, mass, length) =
            (self.config.gravity, self.config.mass, self.config.length);
        let theta_acc = 3.0 * gravity / (2.0 * length) * self.theta.sin()
            + 3.0 / (mass * length * length) * torque;

        self.theta_dot = (self.theta_dot + theta_acc * self.config.dt)
            .clamp(-self.config.max_speed, self.config.max_speed);
        self.theta += self.theta_dot * self.config.dt;
        self.steps += 1;

        Ok(Step {
            observation: self.observation(),
            action: vec![torque],
            reward,
            terminated: false,
            truncated: self.steps >= self.config.max_steps,
        })
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![3]
    }

    fn action_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn action_upper_bound(&self) -> Vec<f64> {
        vec![self.config.max_torque]
    }

    fn current_observation(&self) -> Vec<f64> {
        self.observation()
    }
}

use {
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
        },
        components::GaussianNoise,
        envs::{
            Environment,
            TensorConvertible,
        },
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::Rng,
    serde::{
        Deserialize,
        Serialize,
    },
    tracing::info,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainConfig {
    // The total number of episodes.
    pub max_episodes: usize,
    // Initial scale of the Gaussian exploration noise.
    pub noise_scale: f64,
    // Multiplicative decay applied to the noise scale on every training step.
    pub noise_decay: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_episodes: 200,
            noise_scale: 3.0,
            noise_decay: 0.9995,
        }
    }
}

/// Train an off-policy algorithm on an environment.
///
/// Every step the learner picks an action, the driver perturbs it with
/// exploration noise, clamps it back into the action bounds, steps the
/// environment and records the transition. Training only starts once the
/// replay buffer has been filled completely, since sampling an underfilled
/// buffer would return zero-filled placeholder transitions.
///
/// Returns the total reward of every episode.
pub fn loop_off_policy<Alg, Env, Obs, Act>(
    env: &mut Env,
    alg: &mut Alg,
    config: &TrainConfig,
    device: &Device,
) -> Result<Vec<f64>>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Alg: Algorithm + OffPolicyAlgorithm,
    Obs: Clone + TensorConvertible,
    Act: Clone + TensorConvertible,
{
    info!("observation space: {:?}", env.observation_space());
    info!("action space: {:?}", env.action_space());

    let upper_bound = Tensor::new(env.action_upper_bound(), device)?;
    let lower_bound = upper_bound.neg()?;
    let mut noise = GaussianNoise::new(config.noise_scale, config.noise_decay)?;
    let mut rng = rand::thread_rng();
    let mut mc_returns = Vec::new();

    for episode in 0..config.max_episodes {
        let mut total_reward = 0.0;
        env.reset(rng.gen::<u64>())?;

        loop {
            let state = <Obs>::to_tensor(env.current_observation(), device)?;

            let action = alg.get_next_action(&state)?;
            let action = noise
                .apply(&action)?
                .broadcast_minimum(&upper_bound)?
                .broadcast_maximum(&lower_bound)?;

            let step = env.step(<Act>::from_tensor(action.clone())?)?;
            total_reward += step.reward;

            alg.save_transition(
                &state,
                &action,
                &Tensor::new(vec![step.reward], device)?,
                &<Obs>::to_tensor(step.observation, device)?,
            );

            if alg.replay_buffer().is_full() {
                noise.decay();
                alg.train()?;
            }

            if step.terminated || step.truncated {
                break;
            }
        }

        info!(
            episode,
            total_reward,
            noise_scale = noise.scale(),
            "episode finished"
        );
        mc_returns.push(total_reward);
    }

    Ok(mc_returns)
}

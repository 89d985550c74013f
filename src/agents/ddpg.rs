use {
    super::{
        Algorithm,
        DDPGConfig,
        OffPolicyAlgorithm,
    },
    crate::components::ReplayBuffer,
    candle_core::{
        bail,
        DType,
        Device,
        Error,
        Module,
        Result,
        Tensor,
        Var,
    },
    candle_nn::{
        func,
        linear,
        sequential::seq,
        Activation,
        AdamW,
        Linear,
        Optimizer,
        ParamsAdamW,
        Sequential,
        VarBuilder,
        VarMap,
    },
    tracing::debug,
};

/// Blend every `target_prefix` parameter towards its `predict_prefix`
/// counterpart: `t <- (1 - tau) * t + tau * p`.
///
/// Parameters are paired by name, a target var "target-x-fc0.weight" tracks
/// the predict var "predict-x-fc0.weight". A target var without a predict
/// counterpart is a programming error, as is a shape mismatch between the
/// two (`Var::set` rejects it).
fn track(
    varmap: &VarMap,
    target_prefix: &str,
    predict_prefix: &str,
    tau: f64,
) -> Result<()> {
    let vars = varmap.data().lock().unwrap();
    for (name, target) in vars.iter() {
        let Some(suffix) = name.strip_prefix(target_prefix) else {
            continue;
        };
        let predict = vars
            .get(&format!("{predict_prefix}{suffix}"))
            .ok_or_else(|| {
                Error::Msg(format!("no predict parameter paired with {name}"))
            })?;
        target.set(
            &((tau * predict.as_tensor())?
                + ((1.0 - tau) * target.as_tensor())?)?,
        )?;
    }
    Ok(())
}

/// The deterministic policy: state -> bounded action.
///
/// Two layers, `relu` then `tanh`, with the output scaled elementwise by the
/// environment's per-dimension action upper bound so actions are within
/// bounds by construction.
struct Actor {
    varmap: VarMap,
    network: Sequential,
    target_network: Sequential,
    action_bound: Tensor,
}

impl Actor {
    fn new(
        device: &Device,
        dtype: DType,
        size_state: usize,
        hidden_size: usize,
        size_action: usize,
        action_upper_bound: &[f64],
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let make_network = |prefix: &str| {
            let seq = seq()
                .add(linear(
                    size_state,
                    hidden_size,
                    vb.pp(format!("{prefix}-fc0")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    hidden_size,
                    size_action,
                    vb.pp(format!("{prefix}-out")),
                )?)
                .add(func(|xs| xs.tanh()));
            Ok::<Sequential, Error>(seq)
        };

        let network = make_network("predict-actor")?;
        let target_network = make_network("target-actor")?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&varmap, "target-actor", "predict-actor", 1.0)?;

        Ok(Self {
            varmap,
            network,
            target_network,
            action_bound: Tensor::new(action_upper_bound.to_vec(), device)?,
        })
    }

    fn forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        self.network.forward(state)?.broadcast_mul(&self.action_bound)
    }

    fn target_forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        self.target_network
            .forward(state)?
            .broadcast_mul(&self.action_bound)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        track(&self.varmap, "target-actor", "predict-actor", tau)
    }
}

/// The (state, action) -> value estimator head.
///
/// State and action are projected separately to the hidden width, summed,
/// passed through `relu`, then reduced to a scalar. No output activation,
/// the value estimate is an unbounded real.
struct CriticNetwork {
    phi_state: Linear,
    phi_action: Linear,
    value: Linear,
}

impl CriticNetwork {
    fn forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        let hidden = (self.phi_state.forward(state)?
            + self.phi_action.forward(action)?)?
            .relu()?;
        self.value.forward(&hidden)
    }
}

struct Critic {
    varmap: VarMap,
    network: CriticNetwork,
    target_network: CriticNetwork,
}

impl Critic {
    fn new(
        device: &Device,
        dtype: DType,
        size_state: usize,
        hidden_size: usize,
        size_action: usize,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let make_network = |prefix: &str| {
            Ok::<CriticNetwork, Error>(CriticNetwork {
                phi_state: linear(
                    size_state,
                    hidden_size,
                    vb.pp(format!("{prefix}-state")),
                )?,
                phi_action: linear(
                    size_action,
                    hidden_size,
                    vb.pp(format!("{prefix}-action")),
                )?,
                value: linear(hidden_size, 1, vb.pp(format!("{prefix}-value")))?,
            })
        };

        let network = make_network("predict-critic")?;
        let target_network = make_network("target-critic")?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&varmap, "target-critic", "predict-critic", 1.0)?;

        Ok(Self {
            varmap,
            network,
            target_network,
        })
    }

    fn forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        self.network.forward(state, action)
    }

    fn target_forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        self.target_network.forward(state, action)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        track(&self.varmap, "target-critic", "predict-critic", tau)
    }
}

#[allow(clippy::upper_case_acronyms)]
pub struct DDPG {
    config: DDPGConfig,
    actor: Actor,
    actor_optim: AdamW,
    critic: Critic,
    critic_optim: AdamW,
    replay_buffer: ReplayBuffer,

    size_state: usize,
    size_action: usize,
}

impl DDPG {
    pub fn new(
        device: &Device,
        config: &DDPGConfig,
        size_state: usize,
        size_action: usize,
        action_upper_bound: &[f64],
    ) -> Result<Self> {
        if size_state == 0 || size_action == 0 {
            bail!(
                "state and action dimensions must be positive \
                 (got state {size_state}, action {size_action})"
            );
        }
        if action_upper_bound.len() != size_action {
            bail!(
                "action upper bound has {} entries but the action dimension is {}",
                action_upper_bound.len(),
                size_action,
            );
        }
        if action_upper_bound.iter().any(|bound| !bound.is_finite()) {
            bail!("action upper bound must be finite: {action_upper_bound:?}");
        }
        if !(config.learning_rate.is_finite() && config.learning_rate > 0.0) {
            bail!("learning rate must be positive, got {}", config.learning_rate);
        }
        if !(0.0..=1.0).contains(&config.tau) {
            bail!("tau must lie in [0, 1], got {}", config.tau);
        }
        if config.training_batch_size == 0 {
            bail!("training batch size must be positive");
        }

        let filter_by_prefix = |varmap: &VarMap, prefix: &str| {
            varmap
                .data()
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(name, var)| name.starts_with(prefix).then_some(var.clone()))
                .collect::<Vec<Var>>()
        };

        let actor = Actor::new(
            device,
            DType::F64,
            size_state,
            config.hidden_size,
            size_action,
            action_upper_bound,
        )?;
        let actor_optim = AdamW::new(
            filter_by_prefix(&actor.varmap, "predict-actor"),
            ParamsAdamW {
                lr: config.learning_rate,
                ..Default::default()
            },
        )?;

        let critic = Critic::new(
            device,
            DType::F64,
            size_state,
            config.hidden_size,
            size_action,
        )?;
        // the critic trains at twice the actor's rate
        let critic_optim = AdamW::new(
            filter_by_prefix(&critic.varmap, "predict-critic"),
            ParamsAdamW {
                lr: 2.0 * config.learning_rate,
                ..Default::default()
            },
        )?;

        Ok(Self {
            config: config.clone(),
            actor,
            actor_optim,
            critic,
            critic_optim,
            replay_buffer: ReplayBuffer::new(
                config.replay_buffer_capacity,
                size_state,
                size_action,
                device,
            )?,
            size_state,
            size_action,
        })
    }

    pub fn size_state(&self) -> usize {
        self.size_state
    }

    pub fn size_action(&self) -> usize {
        self.size_action
    }
}

impl Algorithm for DDPG {
    type Config = DDPGConfig;

    fn config(&self) -> &DDPGConfig {
        &self.config
    }

    fn from_config(
        device: &Device,
        config: &DDPGConfig,
        size_state: usize,
        size_action: usize,
        action_upper_bound: &[f64],
    ) -> Result<Box<Self>> {
        Ok(Box::new(Self::new(
            device,
            config,
            size_state,
            size_action,
            action_upper_bound,
        )?))
    }

    fn get_next_action(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        // Candle assumes a batch dimension, so when we don't have one we need
        // to pretend we do by un- and resqueezing the state tensor.
        self.actor.forward(&state.detach()?.unsqueeze(0)?)?.squeeze(0)
    }

    fn train(&mut self) -> Result<()> {
        // The targets blend towards the pre-update predict parameters, so
        // synchronization comes first and the optimizer steps after.
        self.critic.track(self.config.tau)?;
        self.actor.track(self.config.tau)?;

        let (states, actions, rewards, next_states) = self
            .replay_buffer
            .random_batch(self.config.training_batch_size)?;

        let q_next = self
            .critic
            .target_forward(&next_states, &self.actor.target_forward(&next_states)?)?;
        let q_target = (rewards + (self.config.gamma * q_next)?.detach()?)?;
        let q = self.critic.forward(&states, &actions)?;
        let critic_loss = (q_target - q)?.sqr()?.mean_all()?;

        let critic_loss_value = critic_loss.to_scalar::<f64>()?;
        if !critic_loss_value.is_finite() {
            bail!("critic loss diverged: {critic_loss_value}");
        }
        self.critic_optim.backward_step(&critic_loss)?;

        let actor_loss = self
            .critic
            .forward(&states, &self.actor.forward(&states)?)?
            .mean_all()?
            .neg()?;

        let actor_loss_value = actor_loss.to_scalar::<f64>()?;
        if !actor_loss_value.is_finite() {
            bail!("actor loss diverged: {actor_loss_value}");
        }
        self.actor_optim.backward_step(&actor_loss)?;

        debug!(
            critic_loss = critic_loss_value,
            actor_loss = actor_loss_value,
            "training step"
        );

        Ok(())
    }
}

impl OffPolicyAlgorithm for DDPG {
    fn save_transition(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
    ) {
        debug!(
            concat!(
                "\nPushing to replay buffer:",
                "\n{state:?}",
                "\n{action:?}",
                "\n{reward:?}",
                "\n{next_state:?}",
            ),
            state = state,
            action = action,
            reward = reward,
            next_state = next_state,
        );
        self.replay_buffer.push(state, action, reward, next_state)
    }

    fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::collections::HashMap,
    };

    const TAU: f64 = 0.01;

    fn ddpg(
        capacity: usize,
        batch_size: usize,
    ) -> Result<DDPG> {
        let config = DDPGConfig {
            replay_buffer_capacity: capacity,
            training_batch_size: batch_size,
            ..Default::default()
        };
        DDPG::new(&Device::Cpu, &config, 3, 1, &[2.0])
    }

    fn named_values(varmap: &VarMap) -> HashMap<String, Vec<f64>> {
        varmap
            .data()
            .lock()
            .unwrap()
            .iter()
            .map(|(name, var)| {
                let values = var
                    .as_tensor()
                    .flatten_all()
                    .unwrap()
                    .to_vec1::<f64>()
                    .unwrap();
                (name.clone(), values)
            })
            .collect()
    }

    fn nudge(
        varmap: &VarMap,
        prefix: &str,
        delta: f64,
    ) -> Result<()> {
        for (name, var) in varmap.data().lock().unwrap().iter() {
            if name.starts_with(prefix) {
                var.set(&(var.as_tensor() + delta)?)?;
            }
        }
        Ok(())
    }

    fn push_transition(
        alg: &mut DDPG,
        reward: f64,
    ) -> Result<()> {
        let device = Device::Cpu;
        alg.save_transition(
            &Tensor::new(vec![reward, 0.0, -reward], &device)?,
            &Tensor::new(vec![0.5], &device)?,
            &Tensor::new(vec![reward], &device)?,
            &Tensor::new(vec![-reward, reward, 0.0], &device)?,
        );
        Ok(())
    }

    fn total_abs_diff(
        before: &HashMap<String, Vec<f64>>,
        after: &HashMap<String, Vec<f64>>,
        prefix: &str,
    ) -> f64 {
        before
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, old)| {
                old.iter()
                    .zip(&after[name])
                    .map(|(a, b)| (a - b).abs())
                    .sum::<f64>()
            })
            .sum()
    }

    #[test]
    fn construction_validates_environment_metadata() {
        let device = Device::Cpu;
        let config = DDPGConfig::default();
        assert!(DDPG::new(&device, &config, 0, 1, &[2.0]).is_err());
        assert!(DDPG::new(&device, &config, 3, 0, &[]).is_err());
        assert!(DDPG::new(&device, &config, 3, 2, &[2.0]).is_err());
        assert!(DDPG::new(&device, &config, 3, 1, &[f64::INFINITY]).is_err());
        assert!(DDPG::new(&device, &config, 3, 1, &[2.0]).is_ok());
    }

    #[test]
    fn targets_start_equal_to_predict() -> Result<()> {
        let alg = ddpg(5, 2)?;
        for (varmap, predict, target) in [
            (&alg.actor.varmap, "predict-actor", "target-actor"),
            (&alg.critic.varmap, "predict-critic", "target-critic"),
        ] {
            let values = named_values(varmap);
            for (name, predict_values) in
                values.iter().filter(|(name, _)| name.starts_with(predict))
            {
                let target_name =
                    format!("{target}{}", name.strip_prefix(predict).unwrap());
                assert_eq!(predict_values, &values[&target_name]);
            }
        }
        Ok(())
    }

    #[test]
    fn actions_stay_within_bounds() -> Result<()> {
        let device = Device::Cpu;
        let alg = ddpg(5, 2)?;
        for _ in 0..20 {
            let state = (10.0 * Tensor::randn(0.0, 1.0, 3, &device)?)?;
            let action = alg.get_next_action(&state)?;
            let action = action.to_vec1::<f64>()?;
            assert_eq!(action.len(), 1);
            assert!(action.iter().all(|a| a.abs() <= 2.0));
        }
        Ok(())
    }

    #[test]
    fn soft_update_converges_geometrically() -> Result<()> {
        let mut alg = ddpg(5, 2)?;
        // separate predict from target by exactly 1.0 everywhere
        nudge(&alg.actor.varmap, "predict-actor", 1.0)?;

        for step in 1..=3 {
            alg.actor.track(TAU)?;
            let values = named_values(&alg.actor.varmap);
            let expected = (1.0 - TAU).powi(step);
            for (name, predict_values) in values
                .iter()
                .filter(|(name, _)| name.starts_with("predict-actor"))
            {
                let target_name = format!(
                    "target-actor{}",
                    name.strip_prefix("predict-actor").unwrap()
                );
                for (p, t) in predict_values.iter().zip(&values[&target_name]) {
                    assert!((p - t - expected).abs() < 1e-12);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn train_blends_targets_before_optimizing() -> Result<()> {
        let mut alg = ddpg(5, 2)?;
        for reward in 1..=5 {
            push_transition(&mut alg, reward as f64)?;
        }
        assert_eq!(alg.replay_buffer().size(), 5);
        push_transition(&mut alg, 6.0)?;
        assert_eq!(alg.replay_buffer().size(), 5);

        // separate predict from target so the blend is observable
        nudge(&alg.actor.varmap, "predict-actor", 0.25)?;
        nudge(&alg.critic.varmap, "predict-critic", 0.25)?;

        let actor_before = named_values(&alg.actor.varmap);
        let critic_before = named_values(&alg.critic.varmap);

        alg.train()?;

        let actor_after = named_values(&alg.actor.varmap);
        let critic_after = named_values(&alg.critic.varmap);

        // predict parameters moved by the optimizer
        assert!(total_abs_diff(&critic_before, &critic_after, "predict-critic") > 0.0);
        assert!(total_abs_diff(&actor_before, &actor_after, "predict-actor") > 0.0);

        // target parameters moved only by the tau blend, computed from the
        // PRE-update predict parameters
        for (before, after, predict, target) in [
            (&actor_before, &actor_after, "predict-actor", "target-actor"),
            (&critic_before, &critic_after, "predict-critic", "target-critic"),
        ] {
            for (name, old_target) in
                before.iter().filter(|(name, _)| name.starts_with(target))
            {
                let predict_name =
                    format!("{predict}{}", name.strip_prefix(target).unwrap());
                let old_predict = &before[&predict_name];
                for ((t, p), new_t) in
                    old_target.iter().zip(old_predict).zip(&after[name])
                {
                    let expected = (1.0 - TAU) * t + TAU * p;
                    assert!((new_t - expected).abs() < 1e-12);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn non_finite_loss_is_fatal() -> Result<()> {
        let mut alg = ddpg(3, 2)?;
        for _ in 0..3 {
            push_transition(&mut alg, f64::NAN)?;
        }
        assert!(alg.train().is_err());
        Ok(())
    }
}

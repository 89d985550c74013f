use {
    candle_core::{
        bail,
        DType,
        Device,
        Result,
        Tensor,
    },
    rand::{
        distributions::Uniform,
        thread_rng,
        Rng,
    },
    unzip_n::unzip_n,
};

unzip_n!(4);

/// A transition in the replay buffer.
///
/// # Fields
///
/// * `state` - The state tensor.
/// * `action` - The action tensor.
/// * `reward` - The reward tensor, a single element.
/// * `next_state` - The next state tensor.
#[derive(Clone)]
struct Transition {
    state: Tensor,
    action: Tensor,
    reward: Tensor,
    next_state: Tensor,
}
impl Transition {
    fn new(
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
    ) -> Self {
        Self {
            state: state.clone(),
            action: action.clone(),
            reward: reward.clone(),
            next_state: next_state.clone(),
        }
    }

    /// A zero-filled placeholder transition, used to initialize every slot.
    fn zeros(
        size_state: usize,
        size_action: usize,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            state: Tensor::zeros(size_state, DType::F64, device)?,
            action: Tensor::zeros(size_action, DType::F64, device)?,
            reward: Tensor::zeros(1, DType::F64, device)?,
            next_state: Tensor::zeros(size_state, DType::F64, device)?,
        })
    }
}

/// A replay buffer for off-policy algorithms.
///
/// The buffer is a fixed array of `capacity` slots, all zero-initialized at
/// construction. Insertions write at `count % capacity`, so once the buffer
/// has wrapped the oldest transition is silently overwritten.
///
/// Sampling draws indices uniformly with replacement over the FULL capacity,
/// not just the slots written so far. Before the buffer has filled up once
/// this returns zero-filled placeholder transitions, so callers must gate
/// training on [`ReplayBuffer::is_full`].
#[derive(Clone)]
pub struct ReplayBuffer {
    slots: Vec<Transition>,
    capacity: usize,
    count: usize,
}
impl ReplayBuffer {
    /// Create a zero-filled replay buffer with the given capacity.
    pub fn new(
        capacity: usize,
        size_state: usize,
        size_action: usize,
        device: &Device,
    ) -> Result<Self> {
        if capacity == 0 {
            bail!("replay buffer capacity must be positive");
        }
        if size_state == 0 || size_action == 0 {
            bail!(
                "replay buffer dimensions must be positive \
                 (got state {size_state}, action {size_action})"
            );
        }
        let zeros = Transition::zeros(size_state, size_action, device)?;
        Ok(Self {
            slots: vec![zeros; capacity],
            capacity,
            count: 0,
        })
    }

    /// The fixed number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total transitions ever inserted, unbounded.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The number of live transitions.
    pub fn size(&self) -> usize {
        self.count.min(self.capacity)
    }

    /// Check if every slot has been written at least once.
    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Push a transition into the buffer.
    ///
    /// Writes at `count % capacity`, so once the buffer is full the oldest
    /// transition is overwritten in place.
    pub fn push(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
    ) {
        let index = self.count % self.capacity;
        self.slots[index] = Transition::new(state, action, reward, next_state);
        self.count += 1;
    }

    /// Sample a random batch of transitions from the buffer.
    ///
    /// Indices are drawn uniformly with replacement over `[0, capacity)`
    /// regardless of fill level, so an underfilled buffer yields zero-filled
    /// samples. Returns `(states, actions, rewards, next_states)`, each with
    /// a leading batch dimension of `batch_size`.
    pub fn random_batch(
        &self,
        batch_size: usize,
    ) -> Result<(Tensor, Tensor, Tensor, Tensor)> {
        let transition_to_tuple =
            |t: &Transition| -> Result<(Tensor, Tensor, Tensor, Tensor)> {
                Ok((
                    t.state.unsqueeze(0)?,
                    t.action.unsqueeze(0)?,
                    t.reward.unsqueeze(0)?,
                    t.next_state.unsqueeze(0)?,
                ))
            };

        let (states, actions, rewards, next_states) = thread_rng()
            .sample_iter(Uniform::from(0..self.capacity))
            .take(batch_size)
            .map(|i| transition_to_tuple(&self.slots[i]))
            .collect::<Result<Vec<(Tensor, Tensor, Tensor, Tensor)>>>()?
            .into_iter()
            .unzip_n_vec();

        Ok((
            Tensor::cat(&states, 0)?,
            Tensor::cat(&actions, 0)?,
            Tensor::cat(&rewards, 0)?,
            Tensor::cat(&next_states, 0)?,
        ))
    }
}

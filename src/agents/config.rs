use {
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
    std::path::Path,
};


#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DDPGConfig {
    // The learning rate for the Actor network. The Critic network trains at
    // twice this rate.
    pub learning_rate: f64,
    // The impact of the q value of the next state on the current state's q value.
    pub gamma: f64,
    // The weight for updating the target networks.
    pub tau: f64,
    // The number of neurons in the hidden layers of the Actor and Critic networks.
    pub hidden_size: usize,
    // The capacity of the replay buffer used for sampling training data.
    pub replay_buffer_capacity: usize,
    // The training batch size for each training iteration.
    pub training_batch_size: usize,
}

impl Default for DDPGConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            gamma: 0.9,
            tau: 0.01,
            hidden_size: 30,
            replay_buffer_capacity: 10_000,
            training_batch_size: 32,
        }
    }
}

impl DDPGConfig {
    pub fn pendulum() -> Self {
        Self::default()
    }

    /// Load a config from a RON file.
    pub fn from_ron_file(path: &dyn AsRef<Path>) -> Result<Self> {
        Ok(ron::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Write the config to a RON file.
    pub fn to_ron_file(
        &self,
        path: &dyn AsRef<Path>,
    ) -> Result<()> {
        std::fs::write(
            path,
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?,
        )?;
        Ok(())
    }
}

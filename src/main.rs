use {
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    ddpg_rl::{
        agents::{
            Algorithm,
            DDPGConfig,
            DDPG,
        },
        engine::{
            loop_off_policy,
            TrainConfig,
        },
        envs::{
            Environment,
            PendulumConfig,
            PendulumEnv,
        },
        logging::setup_logging,
    },
    std::path::PathBuf,
    tracing::Level,
};

#[derive(ValueEnum, Debug, Clone)]
enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run on CPU rather than on GPU.
    #[arg(long)]
    cpu: bool,

    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::Info)]
    log: Loglevel,

    /// The number of episodes to train for.
    #[arg(long, default_value_t = 200)]
    episodes: usize,

    /// Load the learner config from a RON file instead of the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(level) = args.log.level() {
        setup_logging("ddpg.log", level)?;
    }

    let device = if args.cpu {
        Device::Cpu
    } else {
        Device::cuda_if_available(0)?
    };

    let ddpg_config = match &args.config {
        Some(path) => DDPGConfig::from_ron_file(path)?,
        None => DDPGConfig::pendulum(),
    };
    let train_config = TrainConfig {
        max_episodes: args.episodes,
        ..Default::default()
    };

    let mut env = PendulumEnv::new(PendulumConfig::default())?;
    let mut alg = DDPG::from_config(
        &device,
        &ddpg_config,
        env.observation_space().iter().product(),
        env.action_space().iter().product(),
        &env.action_upper_bound(),
    )?;

    loop_off_policy(env.as_mut(), alg.as_mut(), &train_config, &device)?;

    Ok(())
}

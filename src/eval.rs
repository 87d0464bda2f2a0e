use crate::{
    env::{Environment, Report},
    error::BearError,
    traits::OfflineAgent,
};

pub const EVAL_EPISODE_REWARD: &str = "eval_episode_reward";
pub const EVAL_EPISODE_LENGTH: &str = "eval_episode_length";

/// Run `episodes` greedy episodes of `agent` on `env`
///
/// Returns a [`Report`] with the average return under `eval_episode_reward` and the
/// average number of steps under `eval_episode_length`.
pub fn evaluate<A, E>(agent: &A, env: &mut E, episodes: usize) -> Result<Report, BearError>
where
    A: OfflineAgent + ?Sized,
    E: Environment,
    E::State: Into<Vec<f32>>,
    E::Action: TryFrom<Vec<f32>>,
{
    let mut report = Report::new(vec![EVAL_EPISODE_REWARD, EVAL_EPISODE_LENGTH]);
    if episodes == 0 {
        return Ok(report);
    }

    let mut total_reward = 0.0_f64;
    let mut total_length = 0_usize;

    for _ in 0..episodes {
        let mut state = Some(env.reset());
        while let Some(observation) = state {
            let observation: Vec<f32> = observation.into();
            let action = agent.select_action(&observation);
            let len = action.len();
            let action = E::Action::try_from(action).map_err(|_| BearError::ActionConversion { len })?;

            let (next, reward) = env.step(action);
            total_reward += reward as f64;
            total_length += 1;
            state = next;
        }
    }

    let n = episodes as f64;
    report
        .entry(EVAL_EPISODE_REWARD)
        .and_modify(|x| *x = total_reward / n);
    report
        .entry(EVAL_EPISODE_LENGTH)
        .and_modify(|x| *x = total_length as f64 / n);

    log::info!(
        "evaluation over {episodes} episodes: reward {:.3}, length {:.1}",
        total_reward / n,
        total_length as f64 / n
    );
    Ok(report)
}

//! Bounded fan-out for independent page tasks.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;

/// Run `tasks` with at most `max_in_flight` executing at once.
///
/// As one task finishes the next queued task starts. Every task runs to
/// completion; the returned vector has one entry per task, in task order,
/// regardless of completion order. Failures are just values here, so a
/// failing task never cancels its siblings. A limit of zero is treated as one.
pub async fn run_bounded<I, Fut, T>(tasks: I, max_in_flight: usize) -> Vec<T>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = T>,
{
    run_bounded_until(tasks, max_in_flight, None)
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// Like [`run_bounded`], but stops waiting at `deadline`.
///
/// Tasks that settled before the deadline keep their result; the rest are
/// dropped and their slot is `None`. Slots stay in task order.
pub async fn run_bounded_until<I, Fut, T>(
    tasks: I,
    max_in_flight: usize,
    deadline: Option<Instant>,
) -> Vec<Option<T>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = T>,
{
    let limit = max_in_flight.max(1);
    let tasks: Vec<Fut> = tasks.into_iter().collect();
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(tasks.len()).collect();

    let mut settled = std::pin::pin!(
        stream::iter(
            tasks
                .into_iter()
                .enumerate()
                .map(|(index, task)| async move { (index, task.await) }),
        )
        .buffer_unordered(limit)
    );

    loop {
        let next = match deadline {
            Some(at) => match tokio::time::timeout_at(at, settled.next()).await {
                Ok(next) => next,
                Err(_) => break,
            },
            None => settled.next().await,
        };
        let Some((index, result)) = next else {
            break;
        };
        slots[index] = Some(result);
    }

    slots
}

//! Off-thread solve dispatch.
//!
//! Solves are pure, synchronous computations; a multi-hundred-iteration
//! run must never block rendering or input handling, so requests are
//! handed to a single worker thread over a channel and answered with
//! one response each. The worker processes one request at a time, which
//! bounds resource use at the cost of queuing latency during rapid
//! interaction.
//!
//! Requests carry a monotonically increasing id. There is no
//! cancellation: a solve already in progress simply completes, and
//! [`Dispatcher::poll`] discards any response older than the newest
//! submitted request (last-request-wins).

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::central_path::{self, CentralPathOptions, CentralPathResult};
use crate::error::SolverResult;
use crate::ipm::{self, IpmOptions, IpmResult};
use crate::pdhg::{self, PdhgOptions, PdhgResult};
use crate::problem::{Line, LinearProgram};
use crate::simplex::{self, SimplexOptions, SimplexResult};

/// Per-solver configuration selecting which method runs.
#[derive(Debug, Clone)]
pub enum SolverOptions {
    Simplex(SimplexOptions),
    InteriorPoint(IpmOptions),
    Pdhg(PdhgOptions),
    CentralPath(CentralPathOptions),
}

/// Result of whichever solver the request selected.
#[derive(Debug, Clone)]
pub enum SolverOutput {
    Simplex(SimplexResult),
    InteriorPoint(IpmResult),
    Pdhg(PdhgResult),
    CentralPath(CentralPathResult),
}

/// One solve request: the half-plane list, the objective, and the
/// solver selection.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub id: u64,
    pub lines: Vec<Line>,
    pub objective: Vec<f64>,
    pub options: SolverOptions,
}

/// One solve response, tagged with the request id it answers.
#[derive(Debug)]
pub struct SolveResponse {
    pub id: u64,
    pub outcome: SolverResult<SolverOutput>,
}

/// Run one request synchronously. This is the function the worker
/// thread executes; it is public so callers that already live off the
/// interactive thread can skip the dispatcher.
pub fn solve(lines: &[Line], objective: &[f64], options: &SolverOptions) -> SolverResult<SolverOutput> {
    let lp = LinearProgram::from_lines(lines, objective)?;
    match options {
        SolverOptions::Simplex(opts) => simplex::solve(&lp, opts).map(SolverOutput::Simplex),
        SolverOptions::InteriorPoint(opts) => ipm::solve(&lp, opts).map(SolverOutput::InteriorPoint),
        SolverOptions::Pdhg(opts) => pdhg::solve(&lp, opts).map(SolverOutput::Pdhg),
        SolverOptions::CentralPath(opts) => {
            central_path::solve(&lp, opts).map(SolverOutput::CentralPath)
        }
    }
}

/// Handle to the solver worker thread.
pub struct Dispatcher {
    tx: Option<Sender<SolveRequest>>,
    rx: Receiver<SolveResponse>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
    latest_id: u64,
}

impl Dispatcher {
    /// Spawn the worker thread.
    pub fn spawn() -> Self {
        let (req_tx, req_rx) = channel::<SolveRequest>();
        let (resp_tx, resp_rx) = channel::<SolveResponse>();

        let worker = thread::spawn(move || {
            // Exits when the request channel closes (handle dropped).
            while let Ok(req) = req_rx.recv() {
                let outcome = solve(&req.lines, &req.objective, &req.options);
                if resp_tx
                    .send(SolveResponse {
                        id: req.id,
                        outcome,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            tx: Some(req_tx),
            rx: resp_rx,
            worker: Some(worker),
            next_id: 0,
            latest_id: 0,
        }
    }

    /// Queue a solve and return its id.
    pub fn submit(&mut self, lines: Vec<Line>, objective: Vec<f64>, options: SolverOptions) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.latest_id = id;
        if let Some(tx) = &self.tx {
            if tx
                .send(SolveRequest {
                    id,
                    lines,
                    objective,
                    options,
                })
                .is_err()
            {
                log::warn!("solver worker is gone, request {id} dropped");
            }
        }
        id
    }

    /// Drain ready responses, discarding stale ones, and return the
    /// response for the newest submitted request if it has arrived.
    pub fn poll(&mut self) -> Option<SolveResponse> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(resp) if resp.id == self.latest_id => latest = Some(resp),
                Ok(resp) => log::trace!("discarding stale response {}", resp.id),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// Block until the newest submitted request is answered. Returns
    /// `None` if the worker is gone.
    pub fn wait(&mut self) -> Option<SolveResponse> {
        while let Ok(resp) = self.rx.recv() {
            if resp.id == self.latest_id {
                return Some(resp);
            }
            log::trace!("discarding stale response {}", resp.id);
        }
        None
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing the request channel stops the worker loop.
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square_lines() -> Vec<Line> {
        vec![
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
        ]
    }

    #[test]
    fn test_roundtrip() {
        let mut dispatcher = Dispatcher::spawn();
        let id = dispatcher.submit(
            unit_square_lines(),
            vec![1.0, 1.0],
            SolverOptions::Simplex(SimplexOptions::default()),
        );
        let resp = dispatcher.wait().expect("worker answered");
        assert_eq!(resp.id, id);
        match resp.outcome.unwrap() {
            SolverOutput::Simplex(result) => {
                assert!((result.objective - 2.0).abs() < 1e-8);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn test_last_request_wins() {
        let mut dispatcher = Dispatcher::spawn();
        // Two requests in quick succession: only the newest response
        // survives the stale filter.
        dispatcher.submit(
            unit_square_lines(),
            vec![1.0, 1.0],
            SolverOptions::Simplex(SimplexOptions::default()),
        );
        let id2 = dispatcher.submit(
            unit_square_lines(),
            vec![1.0, 0.0],
            SolverOptions::Simplex(SimplexOptions::default()),
        );
        let resp = dispatcher.wait().expect("worker answered");
        assert_eq!(resp.id, id2);
        assert!(dispatcher.poll().is_none());
    }

    #[test]
    fn test_error_surfaces_through_dispatch() {
        let mut dispatcher = Dispatcher::spawn();
        dispatcher.submit(
            vec![[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]],
            vec![1.0, 1.0],
            SolverOptions::Simplex(SimplexOptions::default()),
        );
        let resp = dispatcher.wait().expect("worker answered");
        assert_eq!(
            resp.outcome.unwrap_err(),
            crate::error::SolverError::Unbounded
        );
    }
}

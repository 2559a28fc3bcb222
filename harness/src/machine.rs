//! Revision state machine: propose, critique, accept-and-advance or
//! reject-and-regraft.
//!
//! The machine owns the thought graph and the running context for one problem
//! instance. It issues oracle calls strictly sequentially and never performs
//! file I/O; persistence and answer extraction belong to the caller.

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument};

use crate::core::graph::{NodeId, NodeStatus, ThoughtGraph};
use crate::core::splitter::StepSplitter;
use crate::core::types::{StepState, Verdict};
use crate::oracle::{ChatOracle, Message};
use crate::prompts::PromptSet;

/// Per-instance machine configuration.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Maximum column index; exceeding it terminates the instance.
    pub max_steps: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self { max_steps: 15 }
    }
}

/// Result of `reset` or `step`: either the next frontier snapshot to
/// critique, or a terminated instance.
#[derive(Debug, Clone)]
pub struct Turn {
    pub state: Option<StepState>,
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingCritique,
    Terminated,
}

/// Orchestrates the revision protocol for a single problem instance.
///
/// Lifecycle: `reset` establishes the root and the first proposed chain, then
/// `step` is called once per critique verdict until a [`Turn`] reports
/// termination. A fresh machine (or another `reset`) is required per problem;
/// no state leaks between instances.
pub struct RevisionMachine<'a> {
    oracle: &'a dyn ChatOracle,
    prompts: &'a PromptSet,
    splitter: StepSplitter,
    max_steps: u32,
    graph: ThoughtGraph,
    phase: Phase,
    /// Running context: system prompt plus every accepted step.
    context: String,
    /// System prompt plus the raw first completion, frozen at reset. Used for
    /// the unrevised answer so improve/worsen rates can be compared.
    first_pass: String,
    frontier: Option<NodeId>,
    next_row: u32,
}

impl<'a> RevisionMachine<'a> {
    pub fn new(oracle: &'a dyn ChatOracle, prompts: &'a PromptSet, config: MachineConfig) -> Self {
        Self {
            oracle,
            prompts,
            splitter: StepSplitter::default(),
            max_steps: config.max_steps,
            graph: ThoughtGraph::new(),
            phase: Phase::Idle,
            context: String::new(),
            first_pass: String::new(),
            frontier: None,
            next_row: 1,
        }
    }

    /// Branch graph for this instance (valid at any point; final after
    /// termination).
    pub fn graph(&self) -> &ThoughtGraph {
        &self.graph
    }

    pub fn into_graph(self) -> ThoughtGraph {
        self.graph
    }

    /// Revised running context (system prompt + accepted steps).
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Unrevised first-pass context captured at reset.
    pub fn first_pass_context(&self) -> &str {
        &self.first_pass
    }

    pub fn terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// Start a problem instance: root node, seeded first completion, row-1
    /// proposed chain, frontier at `(1, 1)`.
    ///
    /// Terminates immediately (one-node graph, root marked terminal) when the
    /// completion contains no step boundary or no usable steps.
    #[instrument(skip_all)]
    pub fn reset(&mut self, question: &str) -> Result<Turn> {
        self.graph = ThoughtGraph::new();
        self.frontier = None;
        self.next_row = 1;

        let system = self.prompts.system(question)?;
        self.graph
            .add_node(NodeId::ROOT, system.clone(), NodeStatus::Accepted, false)?;

        let completion = self
            .oracle
            .complete(&[Message::system(&system), Message::system("1. ")])
            .context("first completion")?;
        self.first_pass = format!("{system}1. {}\n", completion.trim());
        self.context = system;

        if !self.splitter.has_boundary(&completion) {
            debug!("first completion has no step boundary, terminating");
            return Ok(self.finalize()?);
        }
        let steps = self.splitter.split(&completion);
        if steps.is_empty() {
            debug!("first completion produced no usable steps, terminating");
            return Ok(self.finalize()?);
        }

        let frontier = self.propose_batch(NodeId::ROOT, 1, &steps)?;
        self.frontier = Some(frontier);
        self.phase = Phase::AwaitingCritique;
        debug!(steps = steps.len(), "instance reset");
        Ok(Turn {
            state: Some(self.state_for(frontier)?),
            terminated: false,
        })
    }

    /// Apply one critique verdict to the frontier.
    #[instrument(skip_all, fields(accepted = verdict.accepted))]
    pub fn step(&mut self, verdict: &Verdict) -> Result<Turn> {
        if self.phase != Phase::AwaitingCritique {
            bail!("step called outside the critique phase");
        }
        let frontier = self
            .frontier
            .ok_or_else(|| anyhow!("awaiting critique without a frontier"))?;

        let next = if verdict.accepted {
            self.accept(frontier)?
        } else {
            self.reject(frontier, &verdict.advice)?
        };

        match next {
            Some(id) => {
                self.frontier = Some(id);
                Ok(Turn {
                    state: Some(self.state_for(id)?),
                    terminated: false,
                })
            }
            None => Ok(self.finalize()?),
        }
    }

    fn accept(&mut self, frontier: NodeId) -> Result<Option<NodeId>> {
        let text = self
            .graph
            .node(frontier)
            .map(|node| node.text.clone())
            .ok_or_else(|| anyhow!("frontier {frontier} missing from graph"))?;
        self.graph.set_status(frontier, NodeStatus::Accepted)?;
        self.append_to_context(frontier.col, &text);
        debug!(%frontier, "step accepted");
        self.advance(frontier)
    }

    fn reject(&mut self, frontier: NodeId, advice: &str) -> Result<Option<NodeId>> {
        let last = self
            .graph
            .last_on_row(frontier.row)
            .ok_or_else(|| anyhow!("frontier row {} has no nodes", frontier.row))?;
        self.graph.mark_rejected_branch(frontier, last)?;

        let row = self.allocate_row();
        let replacement = NodeId::new(row, frontier.col);
        self.graph
            .add_node(replacement, advice.to_string(), NodeStatus::Accepted, true)?;
        self.graph.add_edge(frontier, replacement)?;
        self.append_to_context(replacement.col, advice);
        debug!(%frontier, %replacement, "step rejected and rewritten");

        let next_col = replacement.col + 1;
        if next_col > self.max_steps {
            return Ok(None);
        }
        let Some(steps) = self.request_continuation()? else {
            return Ok(None);
        };
        Ok(Some(self.propose_chain(row, replacement, next_col, &steps)?))
    }

    /// Move the frontier past an accepted node: reuse its pending proposed
    /// child when one exists, otherwise open a new row from a fresh
    /// continuation.
    fn advance(&mut self, from: NodeId) -> Result<Option<NodeId>> {
        let next_col = from.col + 1;
        if next_col > self.max_steps {
            debug!(max_steps = self.max_steps, "step budget exhausted");
            return Ok(None);
        }

        let pending = self.graph.children_of(from).iter().copied().find(|&id| {
            self.graph
                .node(id)
                .is_some_and(|node| node.status == NodeStatus::Proposed)
        });
        if let Some(id) = pending {
            return Ok(Some(id));
        }

        let Some(steps) = self.request_continuation()? else {
            return Ok(None);
        };
        let row = self.allocate_row();
        Ok(Some(self.propose_chain(row, from, next_col, &steps)?))
    }

    /// Ask the oracle to continue the accepted chain. `None` when the
    /// completion carries no further decomposable steps.
    fn request_continuation(&mut self) -> Result<Option<Vec<String>>> {
        let completion = self
            .oracle
            .complete(&[Message::system(&self.context)])
            .context("continuation completion")?;
        if !self.splitter.has_boundary(&completion) {
            debug!("continuation has no step boundary");
            return Ok(None);
        }
        let steps = self.splitter.split(&completion);
        if steps.is_empty() {
            return Ok(None);
        }
        Ok(Some(steps))
    }

    /// Create a proposed chain on a fresh row starting at `start_col`,
    /// grafted onto `parent`. Returns the first new node.
    fn propose_batch(&mut self, parent: NodeId, start_col: u32, steps: &[String]) -> Result<NodeId> {
        let row = self.allocate_row();
        self.propose_chain(row, parent, start_col, steps)
    }

    fn propose_chain(
        &mut self,
        row: u32,
        parent: NodeId,
        start_col: u32,
        steps: &[String],
    ) -> Result<NodeId> {
        let mut prev = parent;
        for (offset, step) in steps.iter().enumerate() {
            let id = NodeId::new(row, start_col + offset as u32);
            self.graph
                .add_node(id, step.clone(), NodeStatus::Proposed, false)?;
            self.graph.add_edge(prev, id)?;
            prev = id;
        }
        Ok(NodeId::new(row, start_col))
    }

    fn allocate_row(&mut self) -> u32 {
        let row = self.next_row;
        self.next_row += 1;
        row
    }

    fn append_to_context(&mut self, col: u32, text: &str) {
        self.context.push_str(&format!("{col}. {text}\n"));
    }

    /// Finalize the instance: mark the root terminal and stop accepting
    /// verdicts. Exactly one terminal node per finished graph.
    fn finalize(&mut self) -> Result<Turn> {
        self.graph.set_status(NodeId::ROOT, NodeStatus::Terminal)?;
        self.phase = Phase::Terminated;
        self.frontier = None;
        debug!(nodes = self.graph.len(), "instance terminated");
        Ok(Turn {
            state: None,
            terminated: true,
        })
    }

    fn state_for(&self, id: NodeId) -> Result<StepState> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| anyhow!("node {id} missing from graph"))?;
        Ok(StepState {
            context: self.context.clone(),
            col: id.col,
            step: node.text.clone(),
            refined: node.refined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedOracle;

    fn prompts() -> PromptSet {
        PromptSet::new("gsm8k", 0).expect("prompts")
    }

    fn config(max_steps: u32) -> MachineConfig {
        MachineConfig { max_steps }
    }

    /// Direct-acceptance run over a 3-step completion: final chain [A, B, C],
    /// all on one row, all accepted, and every node still present.
    #[test]
    fn accepts_a_three_step_chain_on_a_single_row() {
        let prompts = prompts();
        // Continuation after C has no boundary, so the chain ends there.
        let oracle = ScriptedOracle::new(["A\n#2. B\n#3. C", "That's the full solution."]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, config(5));

        let mut turn = machine.reset("Q").expect("reset");
        assert!(!turn.terminated);
        for _ in 0..5 {
            let state = turn.state.take().expect("state");
            turn = machine
                .step(&Verdict::accept(state.step))
                .expect("step");
            if turn.terminated {
                break;
            }
        }
        assert!(turn.terminated);

        let accepted: Vec<&str> = machine
            .graph()
            .nodes()
            .filter(|node| node.id != NodeId::ROOT)
            .map(|node| {
                assert_eq!(node.status, NodeStatus::Accepted);
                assert_eq!(node.id.row, 1);
                node.text.as_str()
            })
            .collect();
        assert_eq!(accepted, vec!["A", "B", "C"]);
        assert_eq!(
            machine.graph().node(NodeId::ROOT).expect("root").status,
            NodeStatus::Terminal
        );
        assert!(machine.context().contains("1. A\n2. B\n3. C\n"));
    }

    /// Rejecting step 2 creates a refined replacement at `(new row, 2)` with
    /// a graft edge, supersedes the old tail, and rewrites the context.
    #[test]
    fn rejection_regrafts_the_chain_onto_a_new_row() {
        let prompts = prompts();
        let oracle = ScriptedOracle::new([
            "A\n#2. B\n#3. C",
            // Continuation after the revision of step 2.
            "#3. C2",
            // Continuation after accepting C2.
            "No further steps.",
        ]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, config(5));

        let turn = machine.reset("Q").expect("reset");
        let state = turn.state.expect("state");
        let turn = machine.step(&Verdict::accept(state.step)).expect("accept A");

        // Reject step 2 with a replacement.
        let state = turn.state.expect("state");
        assert_eq!(state.step, "B");
        let turn = machine.step(&Verdict::reject("B2")).expect("reject B");

        let rejected = machine.graph().node(NodeId::new(1, 2)).expect("node");
        assert_eq!(rejected.status, NodeStatus::Rejected);
        let superseded = machine.graph().node(NodeId::new(1, 3)).expect("node");
        assert_eq!(superseded.status, NodeStatus::Superseded);

        let replacement = machine.graph().node(NodeId::new(2, 2)).expect("node");
        assert!(replacement.refined);
        assert_eq!(replacement.status, NodeStatus::Accepted);
        assert_eq!(replacement.text, "B2");
        assert!(
            machine
                .graph()
                .children_of(NodeId::new(1, 2))
                .contains(&NodeId::new(2, 2))
        );

        assert!(machine.context().contains("2. B2\n"));
        assert!(!machine.context().contains("2. B\n"));

        // The continuation was proposed on the replacement's row.
        let state = turn.state.expect("state");
        assert_eq!(state.step, "C2");
        assert_eq!(machine.graph().node(NodeId::new(2, 3)).expect("c2").text, "C2");

        let turn = machine.step(&Verdict::accept(state.step)).expect("accept C2");
        assert!(turn.terminated);
    }

    /// A first completion with zero step boundaries terminates immediately
    /// with a one-node graph.
    #[test]
    fn reset_without_step_boundary_terminates_with_root_only() {
        let prompts = prompts();
        let oracle = ScriptedOracle::new(["just an answer, no numbering"]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, config(5));

        let turn = machine.reset("Q").expect("reset");
        assert!(turn.terminated);
        assert!(turn.state.is_none());
        assert_eq!(machine.graph().len(), 1);
        assert_eq!(
            machine.graph().node(NodeId::ROOT).expect("root").status,
            NodeStatus::Terminal
        );
        assert!(machine.terminated());
    }

    /// An empty first completion is equally terminal.
    #[test]
    fn reset_on_empty_completion_terminates() {
        let prompts = prompts();
        let oracle = ScriptedOracle::new([""]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, config(5));

        let turn = machine.reset("Q").expect("reset");
        assert!(turn.terminated);
        assert_eq!(machine.graph().len(), 1);
    }

    /// The budget bounds the column index even when the oracle keeps
    /// producing steps.
    #[test]
    fn step_budget_terminates_a_runaway_chain() {
        let prompts = prompts();
        let oracle = ScriptedOracle::new(["A\n#2. B\n#3. C\n#4. D"]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, config(2));

        let mut turn = machine.reset("Q").expect("reset");
        let mut accepted = 0;
        while let Some(state) = turn.state.take() {
            turn = machine.step(&Verdict::accept(state.step)).expect("step");
            accepted += 1;
        }
        assert!(turn.terminated);
        assert_eq!(accepted, 2);
        // No oracle call was made for a continuation beyond the budget.
        assert_eq!(oracle.remaining(), 0);
    }

    /// Every node ever created survives termination (append-only property).
    #[test]
    fn nodes_are_never_deleted_across_rejections() {
        let prompts = prompts();
        let oracle = ScriptedOracle::new(["A\n#2. B\n#3. C", "#3. C2", "done"]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, config(5));

        let turn = machine.reset("Q").expect("reset");
        let state = turn.state.expect("state");
        let turn = machine.step(&Verdict::accept(state.step)).expect("accept");
        let _ = turn.state.as_ref().expect("state");
        machine.step(&Verdict::reject("B2")).expect("reject");

        // root + A,B,C + replacement + C2 continuation.
        assert_eq!(machine.graph().len(), 6);
    }

    /// Stepping before reset (or after termination) is a caller bug.
    #[test]
    fn step_outside_critique_phase_fails() {
        let prompts = prompts();
        let oracle = ScriptedOracle::new([] as [&str; 0]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, MachineConfig::default());

        let err = machine.step(&Verdict::accept("A")).expect_err("phase");
        assert!(err.to_string().contains("outside the critique phase"));
    }

    /// The first-pass context is frozen at reset while the running context
    /// tracks revisions.
    #[test]
    fn first_pass_context_is_immutable_after_reset() {
        let prompts = prompts();
        let oracle = ScriptedOracle::new(["A\n#2. B", "#2. B2-revised", "done"]);
        let mut machine = RevisionMachine::new(&oracle, &prompts, config(5));

        let turn = machine.reset("Q").expect("reset");
        let before = machine.first_pass_context().to_string();
        let state = turn.state.expect("state");
        machine.step(&Verdict::accept(state.step)).expect("accept");
        machine.step(&Verdict::reject("B2")).expect("reject");

        assert_eq!(machine.first_pass_context(), before);
        assert!(machine.first_pass_context().contains("1. A"));
        assert!(machine.context().contains("2. B2"));
    }
}

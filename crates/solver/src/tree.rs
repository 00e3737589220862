use craftplan_core::{ActionId, CraftState};

/// One node of a private search tree. Owned exclusively by the search
/// instance that created it; forks never share nodes.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub parent: Option<usize>,
    pub action: Option<ActionId>,
    pub state: CraftState,
    pub visits: u32,
    pub score_sum: f64,
    pub max_score: f64,
    pub children: Vec<usize>,
    pub untried: Vec<ActionId>,
    pub terminal: bool,
    pub depth: u32,
}

impl SearchNode {
    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.score_sum / self.visits as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchTree {
    pub nodes: Vec<SearchNode>,
}

impl SearchTree {
    pub fn new(root_state: CraftState, root_untried: Vec<ActionId>, terminal: bool) -> Self {
        Self {
            nodes: vec![SearchNode {
                parent: None,
                action: None,
                state: root_state,
                visits: 0,
                score_sum: 0.0,
                max_score: f64::NEG_INFINITY,
                children: Vec::new(),
                untried: root_untried,
                terminal,
                depth: 0,
            }],
        }
    }

    pub fn add_child(
        &mut self,
        parent: usize,
        action: ActionId,
        state: CraftState,
        untried: Vec<ActionId>,
        terminal: bool,
    ) -> usize {
        let depth = self.nodes[parent].depth + 1;
        let idx = self.nodes.len();
        self.nodes.push(SearchNode {
            parent: Some(parent),
            action: Some(action),
            state,
            visits: 0,
            score_sum: 0.0,
            max_score: f64::NEG_INFINITY,
            children: Vec::new(),
            untried,
            terminal,
            depth,
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Child maximizing `w * max + (1 - w) * mean + c * sqrt(ln(parent) / child)`.
    /// Ties break by catalog order.
    pub fn select_child(&self, parent: usize, w: f64, c: f64) -> Option<usize> {
        let parent_visits = self.nodes[parent].visits.max(1) as f64;
        let mut best: Option<(usize, f64, usize)> = None;
        for child_idx in self.nodes[parent].children.iter().copied() {
            let child = &self.nodes[child_idx];
            let score = if child.visits == 0 {
                f64::INFINITY
            } else {
                w * child.max_score
                    + (1.0 - w) * child.mean_score()
                    + c * (parent_visits.ln() / child.visits as f64).sqrt()
            };
            let order = child
                .action
                .map(|action| action.catalog_index())
                .unwrap_or(usize::MAX);
            let better = match best {
                None => true,
                Some((_, best_score, best_order)) => {
                    score > best_score || (score == best_score && order < best_order)
                }
            };
            if better {
                best = Some((child_idx, score, order));
            }
        }
        best.map(|(idx, _, _)| idx)
    }

    /// Update visit count, running mean, and running max on every ancestor.
    pub fn backpropagate(&mut self, leaf: usize, score: f64) {
        let mut walk = Some(leaf);
        while let Some(idx) = walk {
            let node = &mut self.nodes[idx];
            node.visits = node.visits.saturating_add(1);
            node.score_sum += score;
            if score > node.max_score {
                node.max_score = score;
            }
            walk = node.parent;
        }
    }

    pub fn root(&self) -> &SearchNode {
        &self.nodes[0]
    }
}

//! 运算树
//!
//! 节点存放在 arena 里，`NodeId` 在整个调度周期内保持稳定，
//! 调度器据此维护任务到节点的映射。内部节点随子任务结果回流
//! 坍缩为叶子，根变成叶子即代表求值完成。

use calc_domain::Operation;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// 叶子节点：已知的实数值
    Leaf { value: f64 },
    /// 内部节点：等待两个子节点都变成叶子后才能生成任务
    Op {
        operation: Operation,
        left: NodeId,
        right: NodeId,
        task_scheduled: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprTree {
    nodes: Vec<ExprNode>,
    root: NodeId,
}

impl ExprTree {
    pub(crate) fn new(nodes: Vec<ExprNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ExprNode {
        &self.nodes[id]
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.nodes[id], ExprNode::Leaf { .. })
    }

    pub fn leaf_value(&self, id: NodeId) -> Option<f64> {
        match self.nodes[id] {
            ExprNode::Leaf { value } => Some(value),
            ExprNode::Op { .. } => None,
        }
    }

    /// 根已坍缩为叶子时的最终值
    pub fn root_value(&self) -> Option<f64> {
        self.leaf_value(self.root)
    }

    /// 就绪节点：两个子节点都是叶子且尚未生成任务的内部节点，
    /// 按后序（左子树、右子树、父节点）排列
    pub fn ready_nodes(&self) -> Vec<NodeId> {
        let mut ready = Vec::new();
        self.collect_ready(self.root, &mut ready);
        ready
    }

    fn collect_ready(&self, id: NodeId, ready: &mut Vec<NodeId>) {
        if let ExprNode::Op {
            left,
            right,
            task_scheduled,
            ..
        } = self.nodes[id]
        {
            self.collect_ready(left, ready);
            self.collect_ready(right, ready);
            if !task_scheduled && self.is_leaf(left) && self.is_leaf(right) {
                ready.push(id);
            }
        }
    }

    /// 就绪节点的 (左值, 右值, 运算符)
    pub fn operands(&self, id: NodeId) -> Option<(f64, f64, Operation)> {
        match self.nodes[id] {
            ExprNode::Op {
                operation,
                left,
                right,
                ..
            } => match (self.leaf_value(left), self.leaf_value(right)) {
                (Some(a), Some(b)) => Some((a, b, operation)),
                _ => None,
            },
            ExprNode::Leaf { .. } => None,
        }
    }

    pub fn mark_scheduled(&mut self, id: NodeId) {
        if let ExprNode::Op { task_scheduled, .. } = &mut self.nodes[id] {
            *task_scheduled = true;
        }
    }

    /// 用任务结果把内部节点坍缩为叶子
    pub fn collapse(&mut self, id: NodeId, value: f64) {
        self.nodes[id] = ExprNode::Leaf { value };
    }

    /// 尚未坍缩的内部节点数，等于还需要执行的任务数
    pub fn pending_ops(&self) -> usize {
        self.count_ops(self.root)
    }

    fn count_ops(&self, id: NodeId) -> usize {
        match self.nodes[id] {
            ExprNode::Leaf { .. } => 0,
            ExprNode::Op { left, right, .. } => 1 + self.count_ops(left) + self.count_ops(right),
        }
    }

    fn fmt_node(&self, id: NodeId, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.nodes[id] {
            ExprNode::Leaf { value } => {
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    write!(f, "{}", value as i64)
                } else {
                    write!(f, "{value}")
                }
            }
            ExprNode::Op {
                operation,
                left,
                right,
                ..
            } => {
                write!(f, "(")?;
                self.fmt_node(left, f)?;
                write!(f, "{operation}")?;
                self.fmt_node(right, f)?;
                write!(f, ")")
            }
        }
    }
}

impl std::fmt::Display for ExprTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_node(self.root, f)
    }
}

//! 任务调度器
//!
//! 只有当内部节点的两个子节点都是叶子时才为它生成任务；任务结果
//! 回流后节点坍缩为叶子，重复这一过程直到根成为叶子。单次遍历内
//! 的生成顺序是后序（左子树、右子树、父节点），任务 ID 由存储层
//! 按生成顺序分配。
//!
//! 内存中的执行计划是派生状态，加单把大锁保护（存储层承担真正的
//! 并发协调）；重启后可以由任务行完整重建，见 [`crate::recovery`]。

use std::collections::HashMap;
use std::sync::Arc;

use calc_config::AppConfig;
use calc_domain::{
    Expression, ExpressionRepository, ExpressionStatus, NewTask, Operation, TaskRepository,
};
use calc_errors::CalcResult;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::expression::{ExprTree, NodeId};

/// 各运算符的模拟执行耗时
#[derive(Debug, Clone, Copy)]
pub struct OperationTimes {
    pub addition_ms: i32,
    pub subtraction_ms: i32,
    pub multiplication_ms: i32,
    pub division_ms: i32,
}

impl OperationTimes {
    pub fn resolve(&self, operation: Operation) -> i32 {
        match operation {
            Operation::Add => self.addition_ms,
            Operation::Sub => self.subtraction_ms,
            Operation::Mul => self.multiplication_ms,
            Operation::Div => self.division_ms,
        }
    }
}

impl From<&AppConfig> for OperationTimes {
    fn from(config: &AppConfig) -> Self {
        Self {
            addition_ms: config.time_addition_ms,
            subtraction_ms: config.time_subtraction_ms,
            multiplication_ms: config.time_multiplications_ms,
            division_ms: config.time_divisions_ms,
        }
    }
}

/// 单个表达式的执行计划：运算树加上在途任务到节点的映射
struct ExpressionPlan {
    tree: ExprTree,
    tasks: HashMap<i64, NodeId>,
}

#[derive(Default)]
struct SchedulerState {
    plans: HashMap<i64, ExpressionPlan>,
    /// 在途任务 ID 到所属表达式的反查表
    task_index: HashMap<i64, i64>,
}

/// 恢复单个表达式后的结局
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResumeOutcome {
    /// 重放后根已是叶子，表达式直接完成
    Completed(f64),
    /// 已完成的任务里有非有限值，表达式终结为 error
    Errored,
    /// 仍有任务在途或新任务已补发
    Resumed { replayed: usize, outstanding: usize },
}

pub struct ExpressionScheduler {
    expr_repo: Arc<dyn ExpressionRepository>,
    task_repo: Arc<dyn TaskRepository>,
    op_times: OperationTimes,
    state: Mutex<SchedulerState>,
}

impl ExpressionScheduler {
    pub fn new(
        expr_repo: Arc<dyn ExpressionRepository>,
        task_repo: Arc<dyn TaskRepository>,
        op_times: OperationTimes,
    ) -> Self {
        Self {
            expr_repo,
            task_repo,
            op_times,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// 播种：接收新解析的运算树并生成首批任务
    pub async fn submit(&self, expression_id: i64, tree: ExprTree) -> CalcResult<()> {
        // 纯数字表达式没有任务可做，直接完成
        if let Some(value) = tree.root_value() {
            self.expr_repo
                .update_status(expression_id, ExpressionStatus::Completed, Some(value))
                .await?;
            info!("表达式 {} 无需计算，结果 {}", expression_id, value);
            return Ok(());
        }

        self.expr_repo
            .update_status(expression_id, ExpressionStatus::InProgress, None)
            .await?;

        let mut plan = ExpressionPlan {
            tree,
            tasks: HashMap::new(),
        };

        let mut state = self.state.lock().await;
        let created = self.emit_ready(expression_id, &mut plan).await?;
        debug!("表达式 {} 播种 {} 个任务", expression_id, created.len());

        for task_id in created {
            state.task_index.insert(task_id, expression_id);
        }
        state.plans.insert(expression_id, plan);
        Ok(())
    }

    /// 推进：消费一个已完成任务的结果，坍缩对应节点并生成新就绪的任务。
    /// 未知的任务 ID（重复提交、已终结的表达式）静默丢弃。
    pub async fn apply_result(&self, task_id: i64, result: f64) -> CalcResult<()> {
        let mut state = self.state.lock().await;

        let Some(expression_id) = state.task_index.remove(&task_id) else {
            debug!("丢弃任务 {} 的结果：没有对应的在途计划", task_id);
            return Ok(());
        };
        let Some(mut plan) = state.plans.remove(&expression_id) else {
            return Ok(());
        };

        // 非有限值（除零产生的 NaN、溢出产生的 inf）终结整个表达式，
        // 之后不再为它生成任何任务
        if !result.is_finite() {
            warn!(
                "表达式 {} 的任务 {} 产生非有限结果，终结为 error",
                expression_id, task_id
            );
            for outstanding in plan.tasks.keys() {
                state.task_index.remove(outstanding);
            }
            self.expr_repo
                .update_status(expression_id, ExpressionStatus::Error, None)
                .await?;
            return Ok(());
        }

        if let Some(node) = plan.tasks.remove(&task_id) {
            plan.tree.collapse(node, result);
        }

        if let Some(value) = plan.tree.root_value() {
            self.expr_repo
                .update_status(expression_id, ExpressionStatus::Completed, Some(value))
                .await?;
            info!("表达式 {} 计算完成，结果 {}", expression_id, value);
            return Ok(());
        }

        let created = self.emit_ready(expression_id, &mut plan).await?;
        for new_task in created {
            state.task_index.insert(new_task, expression_id);
        }
        state.plans.insert(expression_id, plan);
        Ok(())
    }

    /// 重启恢复：用已持久化的任务行重放一个未完成的表达式。
    ///
    /// 生成顺序是确定性的后序，重放按操作数和运算符把任务行匹配回
    /// 就绪节点：已完成的行坍缩节点，未完成的行重新登记为在途任务，
    /// 缺失的行（播种中途崩溃）补发新任务。
    pub async fn resume(&self, expression: &Expression, tree: ExprTree) -> CalcResult<ResumeOutcome> {
        let mut unmatched = self.task_repo.get_by_expression(expression.id).await?;
        let mut plan = ExpressionPlan {
            tree,
            tasks: HashMap::new(),
        };
        let mut replayed = 0;

        loop {
            let ready = plan.tree.ready_nodes();
            if ready.is_empty() {
                break;
            }
            let mut collapsed = false;
            for node in ready {
                let Some((arg1, arg2, operation)) = plan.tree.operands(node) else {
                    continue;
                };
                let matched = unmatched
                    .iter()
                    .position(|t| t.operation == operation && t.arg1 == arg1 && t.arg2 == arg2);
                let Some(position) = matched else {
                    continue;
                };
                let task = unmatched.remove(position);
                plan.tree.mark_scheduled(node);
                if task.completed {
                    let value = task.result.unwrap_or(f64::NAN);
                    if !value.is_finite() {
                        self.expr_repo
                            .update_status(expression.id, ExpressionStatus::Error, None)
                            .await?;
                        warn!("表达式 {} 重放时发现非有限结果，终结为 error", expression.id);
                        return Ok(ResumeOutcome::Errored);
                    }
                    plan.tree.collapse(node, value);
                    replayed += 1;
                    collapsed = true;
                } else {
                    plan.tasks.insert(task.id, node);
                }
            }
            if !collapsed {
                break;
            }
        }

        if let Some(value) = plan.tree.root_value() {
            self.expr_repo
                .update_status(expression.id, ExpressionStatus::Completed, Some(value))
                .await?;
            info!("表达式 {} 重放后直接完成，结果 {}", expression.id, value);
            return Ok(ResumeOutcome::Completed(value));
        }

        if expression.status == ExpressionStatus::Pending {
            self.expr_repo
                .update_status(expression.id, ExpressionStatus::InProgress, None)
                .await?;
        }

        let mut state = self.state.lock().await;
        let created = self.emit_ready(expression.id, &mut plan).await?;
        for task_id in created {
            state.task_index.insert(task_id, expression.id);
        }
        for task_id in plan.tasks.keys() {
            state.task_index.insert(*task_id, expression.id);
        }
        let outstanding = plan.tasks.len();
        state.plans.insert(expression.id, plan);

        debug!(
            "表达式 {} 恢复：重放 {} 个已完成任务，{} 个任务在途",
            expression.id, replayed, outstanding
        );
        Ok(ResumeOutcome::Resumed {
            replayed,
            outstanding,
        })
    }

    /// 为所有就绪节点生成并持久化任务，返回新任务 ID（生成顺序即后序）
    async fn emit_ready(
        &self,
        expression_id: i64,
        plan: &mut ExpressionPlan,
    ) -> CalcResult<Vec<i64>> {
        let mut created = Vec::new();
        for node in plan.tree.ready_nodes() {
            let Some((arg1, arg2, operation)) = plan.tree.operands(node) else {
                continue;
            };
            let task = self
                .task_repo
                .create(&NewTask {
                    expression_id,
                    arg1,
                    arg2,
                    operation,
                    operation_time_ms: self.op_times.resolve(operation),
                })
                .await?;
            plan.tree.mark_scheduled(node);
            plan.tasks.insert(task.id, node);
            created.push(task.id);
        }
        Ok(created)
    }

    /// 当前在途计划数，用于健康检查
    pub async fn active_plans(&self) -> usize {
        self.state.lock().await.plans.len()
    }
}

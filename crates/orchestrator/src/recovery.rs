//! 重启恢复
//!
//! 运算树不落库。启动时读出所有未终结的表达式，重新解析文本，
//! 把已持久化的任务行重放进调度器，从中断点继续。

use std::sync::Arc;

use calc_domain::{ExpressionRepository, ExpressionStatus};
use calc_errors::CalcResult;
use tracing::{error, info, warn};

use crate::expression::parse;
use crate::scheduler::{ExpressionScheduler, ResumeOutcome};

/// 一次恢复的统计结果
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    /// 重放后继续执行的表达式数
    pub resumed: usize,
    /// 重放后直接终结（完成或出错）的表达式数
    pub finalized: usize,
    /// 存储的文本无法重新解析、被置为 error 的表达式数
    pub unparseable: usize,
}

pub struct RecoveryService {
    expr_repo: Arc<dyn ExpressionRepository>,
    scheduler: Arc<ExpressionScheduler>,
}

impl RecoveryService {
    pub fn new(
        expr_repo: Arc<dyn ExpressionRepository>,
        scheduler: Arc<ExpressionScheduler>,
    ) -> Self {
        Self {
            expr_repo,
            scheduler,
        }
    }

    /// 恢复系统状态，幂等，启动时调用一次
    pub async fn recover(&self) -> CalcResult<RecoveryReport> {
        let unfinished = self.expr_repo.get_unfinished().await?;
        if unfinished.is_empty() {
            info!("没有需要恢复的表达式");
            return Ok(RecoveryReport::default());
        }

        info!("开始恢复 {} 个未完成的表达式", unfinished.len());
        let mut report = RecoveryReport::default();

        for expression in unfinished {
            let tree = match parse(&expression.expression) {
                Ok(tree) => tree,
                Err(e) => {
                    // 存储的文本解析不回来，只能终结为 error
                    error!("表达式 {} 无法重新解析: {}", expression.id, e);
                    self.expr_repo
                        .update_status(expression.id, ExpressionStatus::Error, None)
                        .await?;
                    report.unparseable += 1;
                    continue;
                }
            };

            match self.scheduler.resume(&expression, tree).await? {
                ResumeOutcome::Completed(value) => {
                    info!("表达式 {} 恢复后直接完成，结果 {}", expression.id, value);
                    report.finalized += 1;
                }
                ResumeOutcome::Errored => {
                    warn!("表达式 {} 恢复后终结为 error", expression.id);
                    report.finalized += 1;
                }
                ResumeOutcome::Resumed {
                    replayed,
                    outstanding,
                } => {
                    info!(
                        "表达式 {} 恢复执行：重放 {} 个结果，{} 个任务在途",
                        expression.id, replayed, outstanding
                    );
                    report.resumed += 1;
                }
            }
        }

        info!(
            "恢复完成：继续 {} 个，终结 {} 个，解析失败 {} 个",
            report.resumed, report.finalized, report.unparseable
        );
        Ok(report)
    }
}

//! Test data builders for creating test entities
//!
//! Builder patterns with sensible defaults and easy customization.

use calc_domain::{Expression, ExpressionStatus, Operation, Task};
use chrono::{DateTime, Utc};

/// Builder for creating test Expression entities
pub struct ExpressionBuilder {
    expression: Expression,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self {
            expression: Expression {
                id: 1,
                user_id: 1,
                expression: "1+1".to_string(),
                status: ExpressionStatus::Pending,
                result: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.expression.id = id;
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.expression.user_id = user_id;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.expression.expression = text.to_string();
        self
    }

    pub fn with_status(mut self, status: ExpressionStatus) -> Self {
        self.expression.status = status;
        self
    }

    pub fn with_result(mut self, result: f64) -> Self {
        self.expression.result = Some(result);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.expression.created_at = created_at;
        self
    }

    pub fn in_progress(mut self) -> Self {
        self.expression.status = ExpressionStatus::InProgress;
        self
    }

    pub fn build(self) -> Expression {
        self.expression
    }
}

impl Default for ExpressionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Task entities
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: Task {
                id: 1,
                expression_id: 1,
                arg1: 1.0,
                arg2: 1.0,
                operation: Operation::Add,
                operation_time_ms: 100,
                started_at: None,
                completed: false,
                result: None,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_expression_id(mut self, expression_id: i64) -> Self {
        self.task.expression_id = expression_id;
        self
    }

    pub fn with_args(mut self, arg1: f64, arg2: f64) -> Self {
        self.task.arg1 = arg1;
        self.task.arg2 = arg2;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.task.operation = operation;
        self
    }

    pub fn with_operation_time_ms(mut self, operation_time_ms: i32) -> Self {
        self.task.operation_time_ms = operation_time_ms;
        self
    }

    pub fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.task.started_at = Some(started_at);
        self
    }

    /// Mark the task as already completed with the given result
    pub fn completed(mut self, result: f64) -> Self {
        self.task.completed = true;
        self.task.result = Some(result);
        self.task.started_at.get_or_insert_with(Utc::now);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

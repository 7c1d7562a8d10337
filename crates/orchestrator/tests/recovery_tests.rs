use std::sync::Arc;

use calc_domain::{ExpressionRepository, ExpressionStatus, TaskRepository, UserRepository};
use calc_infrastructure::{
    SqliteExpressionRepository, SqliteTaskRepository, SqliteUserRepository,
};
use calc_orchestrator::{
    expression::parse, ExpressionScheduler, OperationTimes, RecoveryService,
};
use calc_testing_utils::test_database;
use chrono::Duration;

const TIMES: OperationTimes = OperationTimes {
    addition_ms: 100,
    subtraction_ms: 100,
    multiplication_ms: 100,
    division_ms: 100,
};

fn make_scheduler(
    exprs: &Arc<SqliteExpressionRepository>,
    tasks: &Arc<SqliteTaskRepository>,
) -> Arc<ExpressionScheduler> {
    Arc::new(ExpressionScheduler::new(exprs.clone(), tasks.clone(), TIMES))
}

#[tokio::test]
async fn test_recover_resumes_after_simulated_crash() {
    let db = test_database().await;
    let users = SqliteUserRepository::new(db.pool.clone());
    let exprs = Arc::new(SqliteExpressionRepository::new(db.pool.clone()));
    let tasks = Arc::new(SqliteTaskRepository::new(db.pool.clone()));
    let user = users.create("alice", "hash").await.unwrap();

    // 第一个进程：播种 (1+2)*(3+4)，两个加法完成落库，
    // 但推进遍历还没跑（内存计划随崩溃丢失）
    let scheduler = make_scheduler(&exprs, &tasks);
    let expr = exprs.create(user.id, "(1+2)*(3+4)").await.unwrap();
    scheduler
        .submit(expr.id, parse(&expr.expression).unwrap())
        .await
        .unwrap();

    let seeded = tasks.get_by_expression(expr.id).await.unwrap();
    assert_eq!(seeded.len(), 2);
    tasks.complete(seeded[0].id, 3.0).await.unwrap();
    tasks.complete(seeded[1].id, 7.0).await.unwrap();

    // 第二个进程：全新的调度器从任务行重建进度
    let scheduler = make_scheduler(&exprs, &tasks);
    let recovery = RecoveryService::new(exprs.clone(), scheduler.clone());
    let report = recovery.recover().await.unwrap();
    assert_eq!(report.resumed, 1);
    assert_eq!(report.unparseable, 0);

    // 重放后乘法被补发
    let rows = tasks.get_by_expression(expr.id).await.unwrap();
    assert_eq!(rows.len(), 3);
    let mul = rows[2].clone();
    assert_eq!((mul.arg1, mul.arg2), (3.0, 7.0));

    // Worker 把乘法做完，表达式以根值收敛
    tasks.complete(mul.id, 21.0).await.unwrap();
    scheduler.apply_result(mul.id, 21.0).await.unwrap();

    let done = exprs.get_by_id(expr.id, user.id).await.unwrap().unwrap();
    assert_eq!(done.status, ExpressionStatus::Completed);
    assert_eq!(done.result, Some(21.0));
}

#[tokio::test]
async fn test_recover_finalizes_expression_with_all_results_present() {
    let db = test_database().await;
    let users = SqliteUserRepository::new(db.pool.clone());
    let exprs = Arc::new(SqliteExpressionRepository::new(db.pool.clone()));
    let tasks = Arc::new(SqliteTaskRepository::new(db.pool.clone()));
    let user = users.create("alice", "hash").await.unwrap();

    let scheduler = make_scheduler(&exprs, &tasks);
    let expr = exprs.create(user.id, "1+1").await.unwrap();
    scheduler
        .submit(expr.id, parse(&expr.expression).unwrap())
        .await
        .unwrap();
    let seeded = tasks.get_by_expression(expr.id).await.unwrap();
    tasks.complete(seeded[0].id, 2.0).await.unwrap();

    // 唯一的任务已完成：恢复直接终结表达式
    let scheduler = make_scheduler(&exprs, &tasks);
    let recovery = RecoveryService::new(exprs.clone(), scheduler);
    let report = recovery.recover().await.unwrap();
    assert_eq!(report.finalized, 1);

    let done = exprs.get_by_id(expr.id, user.id).await.unwrap().unwrap();
    assert_eq!(done.status, ExpressionStatus::Completed);
    assert_eq!(done.result, Some(2.0));
}

#[tokio::test]
async fn test_recover_marks_unparseable_rows_as_error() {
    let db = test_database().await;
    let users = SqliteUserRepository::new(db.pool.clone());
    let exprs = Arc::new(SqliteExpressionRepository::new(db.pool.clone()));
    let tasks = Arc::new(SqliteTaskRepository::new(db.pool.clone()));
    let user = users.create("alice", "hash").await.unwrap();

    // 绕过解析直接落库一条坏文本（模拟旧版本写入的脏数据）
    let expr = exprs.create(user.id, "2++2").await.unwrap();

    let scheduler = make_scheduler(&exprs, &tasks);
    let recovery = RecoveryService::new(exprs.clone(), scheduler);
    let report = recovery.recover().await.unwrap();
    assert_eq!(report.unparseable, 1);

    let stored = exprs.get_by_id(expr.id, user.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExpressionStatus::Error);
    assert_eq!(stored.result, None);
}

#[tokio::test]
async fn test_recover_is_idempotent_without_unfinished_work() {
    let db = test_database().await;
    let exprs = Arc::new(SqliteExpressionRepository::new(db.pool.clone()));
    let tasks = Arc::new(SqliteTaskRepository::new(db.pool.clone()));

    let scheduler = make_scheduler(&exprs, &tasks);
    let recovery = RecoveryService::new(exprs.clone(), scheduler);
    let report = recovery.recover().await.unwrap();
    assert_eq!(report.resumed, 0);
    assert_eq!(report.finalized, 0);
    assert_eq!(report.unparseable, 0);
}

#[tokio::test]
async fn test_stale_claim_reclamation_after_worker_crash() {
    let db = test_database().await;
    let users = SqliteUserRepository::new(db.pool.clone());
    let exprs = Arc::new(SqliteExpressionRepository::new(db.pool.clone()));
    let tasks = Arc::new(SqliteTaskRepository::new(db.pool.clone()));
    let user = users.create("alice", "hash").await.unwrap();

    let scheduler = make_scheduler(&exprs, &tasks);
    let expr = exprs.create(user.id, "1+2").await.unwrap();
    scheduler
        .submit(expr.id, parse(&expr.expression).unwrap())
        .await
        .unwrap();

    // 第一个 Worker 认领后崩溃，没有提交结果
    let claimed = tasks.claim_next(Duration::seconds(300)).await.unwrap();
    let task_id = claimed.unwrap().id;

    // 阈值之内任务仍然被占用
    assert!(tasks
        .claim_next(Duration::seconds(300))
        .await
        .unwrap()
        .is_none());

    // 阈值过期后下一个认领者拿到同一个任务并完成它
    let reclaimed = tasks.claim_next(Duration::zero()).await.unwrap().unwrap();
    assert_eq!(reclaimed.id, task_id);
    tasks.complete(task_id, 3.0).await.unwrap();
    scheduler.apply_result(task_id, 3.0).await.unwrap();

    let done = exprs.get_by_id(expr.id, user.id).await.unwrap().unwrap();
    assert_eq!(done.status, ExpressionStatus::Completed);
    assert_eq!(done.result, Some(3.0));
}

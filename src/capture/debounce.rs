/// 防抖器
///
/// 每次调用都会重新开始静默窗口，窗口内没有新调用时才以最后一次的参数触发处理函数。
/// 处理函数在独立任务中运行，不阻塞后续事件的接收。

use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// 启动防抖任务（需要在 tokio 运行时内调用）
    ///
    /// Debouncer 被丢弃后任务随之结束，尚未触发的调用直接丢弃
    pub fn spawn<F, Fut>(wait: Duration, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        tokio::spawn(async move {
            let mut pending: Option<T> = None;

            loop {
                match pending.take() {
                    None => match rx.recv().await {
                        Some(value) => pending = Some(value),
                        None => break,
                    },
                    Some(value) => match timeout(wait, rx.recv()).await {
                        // 窗口内有新事件，重新计时
                        Ok(Some(newer)) => pending = Some(newer),
                        Ok(None) => {
                            debug!("Debouncer closed with a pending call, dropping it");
                            break;
                        }
                        Err(_) => {
                            tokio::spawn(handler(value));
                        }
                    },
                }
            }
        });

        Self { tx }
    }

    /// 提交一次调用
    pub fn call(&self, value: T) {
        // 接收端只会在任务结束后关闭，此时丢弃即可
        let _ = self.tx.send(value);
    }
}

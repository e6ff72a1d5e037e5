/// 页面活动监听
///
/// 根据滚动、点击和离开页面三类事件决定何时捕获页面内容：
/// - 滚动经过防抖，位移超过阈值才触发
/// - 点击可激活控件（链接、按钮等）立即触发
/// - 离开页面无条件触发一次（尽力而为）
///
/// 同一页面同时最多只有一次捕获在进行，忙碌时新的触发直接丢弃。
/// 所有错误都在这里记录并吞掉，不会抛给事件处理方。

use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::debounce::Debouncer;
use super::{ContentExtractor, PageSource};
use crate::config::AppConfig;
use crate::transport::{Message, Transport};

/// 可激活控件判定
pub trait Activatable {
    fn is_activation_control(&self) -> bool;
}

/// 宿主上报的点击目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    /// 元素标签名
    pub tag: String,
    /// ARIA role
    pub role: Option<String>,
}

impl ClickTarget {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            role: None,
        }
    }

    pub fn with_role(self, role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..self
        }
    }
}

impl Activatable for ClickTarget {
    fn is_activation_control(&self) -> bool {
        let tag = self.tag.to_ascii_lowercase();
        let role = self.role.as_deref().map(str::to_ascii_lowercase);
        matches!(tag.as_str(), "a" | "button")
            || matches!(role.as_deref(), Some("link") | Some("button"))
    }
}

/// 一次触发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// 已发送给后台
    Sent,
    /// 页面没有可读正文
    NoContent,
    /// 已有捕获在进行，本次丢弃
    Skipped,
    /// 未满足触发条件
    Ignored,
    /// 快照或发送失败（已记录日志）
    Failed,
}

/// 监听配置
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// 滚动触发阈值
    pub scroll_threshold: f64,
    /// 滚动防抖窗口
    pub debounce: Duration,
    /// 是否启用（对应设置中的 autoTrack）
    pub enabled: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: 100.0,
            debounce: Duration::from_millis(200),
            enabled: true,
        }
    }
}

impl MonitorConfig {
    pub fn from_app(config: &AppConfig, auto_track: bool) -> Self {
        Self {
            scroll_threshold: config.scroll_threshold,
            debounce: config.debounce(),
            enabled: auto_track,
        }
    }
}

/// 单飞标记的作用域守卫，离开作用域时一定会复位
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 页面活动监听器
pub struct ActivityMonitor {
    source: Arc<dyn PageSource>,
    transport: Arc<dyn Transport>,
    extractor: ContentExtractor,
    config: MonitorConfig,
    last_scroll_offset: Mutex<f64>,
    is_processing: AtomicBool,
    has_left: AtomicBool,
    scroll: Debouncer<f64>,
}

impl ActivityMonitor {
    /// 创建监听器（需要在 tokio 运行时内调用，滚动防抖任务随之启动）
    pub fn new(
        source: Arc<dyn PageSource>,
        transport: Arc<dyn Transport>,
        extractor: ContentExtractor,
        config: MonitorConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<ActivityMonitor>| {
            let weak = weak.clone();
            let scroll = Debouncer::spawn(config.debounce, move |offset: f64| {
                let weak = weak.clone();
                async move {
                    if let Some(monitor) = weak.upgrade() {
                        monitor.handle_scroll(offset).await;
                    }
                }
            });

            Self {
                source,
                transport,
                extractor,
                config,
                last_scroll_offset: Mutex::new(0.0),
                is_processing: AtomicBool::new(false),
                has_left: AtomicBool::new(false),
                scroll,
            }
        })
    }

    /// 是否有捕获正在进行
    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::Acquire)
    }

    /// 上次触发捕获时的滚动位置
    pub fn last_scroll_offset(&self) -> f64 {
        self.last_scroll_offset
            .lock()
            .map(|offset| *offset)
            .unwrap_or_default()
    }

    /// 滚动事件（经过防抖后进入 `handle_scroll`）
    pub fn on_scroll(&self, offset: f64) {
        if self.config.enabled {
            self.scroll.call(offset);
        }
    }

    /// 防抖后的滚动处理：位移严格大于阈值才捕获
    pub async fn handle_scroll(&self, offset: f64) -> CaptureOutcome {
        let crossed = match self.last_scroll_offset.lock() {
            Ok(mut last) => {
                if (offset - *last).abs() > self.config.scroll_threshold {
                    *last = offset;
                    true
                } else {
                    false
                }
            }
            Err(_) => {
                error!("Scroll offset lock poisoned");
                false
            }
        };

        if !crossed {
            return CaptureOutcome::Ignored;
        }

        self.capture().await
    }

    /// 点击事件：只有可激活控件才触发
    pub async fn on_click<T: Activatable + ?Sized>(&self, target: &T) -> CaptureOutcome {
        if !target.is_activation_control() {
            return CaptureOutcome::Ignored;
        }
        self.capture().await
    }

    /// 离开页面：只触发一次，不保证在页面销毁前完成
    pub async fn on_page_leave(&self) -> CaptureOutcome {
        if self.has_left.swap(true, Ordering::AcqRel) {
            return CaptureOutcome::Ignored;
        }
        self.capture().await
    }

    /// 捕获入口：提取正文并发送给后台
    pub async fn capture(&self) -> CaptureOutcome {
        if !self.config.enabled {
            return CaptureOutcome::Ignored;
        }

        let Some(_guard) = ProcessingGuard::acquire(&self.is_processing) else {
            debug!("Capture already in progress, dropping trigger");
            return CaptureOutcome::Skipped;
        };

        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Error extracting content: {}", e);
                return CaptureOutcome::Failed;
            }
        };

        let page = match self.extractor.extract(&snapshot) {
            Some(page) => page,
            None => return CaptureOutcome::NoContent,
        };

        let title = page.title.clone();
        match self.transport.send(Message::page_content(page)) {
            Ok(()) => {
                info!("Captured \"{}\" from {}", title, snapshot.url);
                CaptureOutcome::Sent
            }
            Err(e) => {
                error!("Error processing page content: {}", e);
                CaptureOutcome::Failed
            }
        }
    }
}

/// 可取消的防抖定时器，由宿主提供的毫秒时钟驱动。
///
/// 在静默期内重复 `schedule` 会替换待触发的值并推迟截止时间，
/// 因此只有最后一次输入会在 `poll` 中触发。
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// 安排一次触发，覆盖尚未触发的值
    pub fn schedule(&mut self, value: T, now_ms: u64) {
        self.pending = Some((value, now_ms.saturating_add(self.delay_ms)));
    }

    /// 取消待触发的值，返回被取消的值
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 下一次触发的截止时间
    pub fn deadline(&self) -> Option<u64> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// 到达截止时间时取出待触发的值
    pub fn poll(&mut self, now_ms: u64) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now_ms >= deadline => self.cancel(),
            _ => None,
        }
    }
}

/// 出入口计数引擎 (Entrance counting)
///
/// 每帧输入跟踪结果, 根据目标中心点相对门线的上下变化判断进出:
/// - DOOR1 (line1): 向下穿越为 IN, 向上穿越为 OUT
/// - DOOR2 (line2): 向上穿越为 IN, 向下穿越为 OUT
///
/// 两条门线独立判断, 不去重, 不做滞回 (可选 dead_band)。
use crate::detection::TrackedObject;
use crate::region::{Door, EntranceGeometry, RegionConfig};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// 穿越方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => f.write_str("IN"),
            Direction::Out => f.write_str("OUT"),
        }
    }
}

/// 一次穿越
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingEvent {
    pub track_id: i64,
    pub direction: Direction,
    pub door: Door,
    pub frame_id: u64,
}

/// 计数参数 (只能通过 new 构造, 两个参数都不为 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSettings {
    video_fps: u64,
    interval_secs: u64,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            video_fps: 30,
            interval_secs: 2,
        }
    }
}

impl CounterSettings {
    /// 两个参数都至少为 1
    pub fn new(video_fps: u64, interval_secs: u64) -> Self {
        Self {
            video_fps: video_fps.max(1),
            interval_secs: interval_secs.max(1),
        }
    }

    /// 名义帧率, 仅用于区间划分
    pub fn video_fps(&self) -> u64 {
        self.video_fps
    }

    /// 区间长度 (秒)
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// 该帧是否为区间边界 (frame_id 从 1 开始)
    pub fn is_rollover(&self, frame_id: u64) -> bool {
        frame_id > 0
            && frame_id % self.video_fps == 0
            && (frame_id / self.video_fps) % self.interval_secs == 0
    }
}

/// 一次运行的累计计数
#[derive(Debug, Clone, Default)]
pub struct CountingState {
    seen_ids: HashSet<i64>,
    interval_ids: HashSet<i64>,
    in_events: Vec<i64>,
    out_events: Vec<i64>,
    records: Vec<String>,
}

impl CountingState {
    /// 累计出现过的目标数
    pub fn total_count(&self) -> usize {
        self.seen_ids.len()
    }

    pub fn in_count(&self) -> usize {
        self.in_events.len()
    }

    pub fn out_count(&self) -> usize {
        self.out_events.len()
    }

    /// 当前区间内出现的目标数
    pub fn interval_count(&self) -> usize {
        self.interval_ids.len()
    }

    pub fn seen_ids(&self) -> &HashSet<i64> {
        &self.seen_ids
    }

    pub fn interval_ids(&self) -> &HashSet<i64> {
        &self.interval_ids
    }

    /// IN 事件的 track_id, 按发生顺序
    pub fn in_events(&self) -> &[i64] {
        &self.in_events
    }

    pub fn out_events(&self) -> &[i64] {
        &self.out_events
    }

    /// 每帧一条的计数记录
    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn last_record(&self) -> Option<&str> {
        self.records.last().map(String::as_str)
    }
}

/// 单帧处理结果
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_id: u64,
    pub geometry: EntranceGeometry,
    pub events: Vec<CrossingEvent>,
    /// 区间边界帧才有值
    pub interval_count: Option<usize>,
    pub record: String,
}

#[derive(Debug, Clone, Copy)]
struct TrackMemory {
    center_y: f32,
    last_seen: u64,
}

/// 计数引擎, 每次运行一个实例, 只在处理线程中使用
#[derive(Debug)]
pub struct EntranceCounter {
    settings: CounterSettings,
    prev_center: HashMap<i64, TrackMemory>,
    state: CountingState,
    evict_after: Option<u64>,
    dead_band: f32,
}

impl EntranceCounter {
    pub fn new(settings: CounterSettings) -> Self {
        Self {
            settings,
            prev_center: HashMap::new(),
            state: CountingState::default(),
            evict_after: None,
            dead_band: 0.0,
        }
    }

    /// N 帧未出现的目标忘记上一位置 (默认不清理)
    pub fn with_eviction(mut self, evict_after: Option<u64>) -> Self {
        self.evict_after = evict_after;
        self
    }

    /// 门线两侧的死区 (像素), 0 表示严格比较
    pub fn with_dead_band(mut self, dead_band: f32) -> Self {
        self.dead_band = dead_band.max(0.0);
        self
    }

    pub fn settings(&self) -> CounterSettings {
        self.settings
    }

    pub fn state(&self) -> &CountingState {
        &self.state
    }

    pub fn into_state(self) -> CountingState {
        self.state
    }

    /// 记住上一位置的目标数
    pub fn tracked_positions(&self) -> usize {
        self.prev_center.len()
    }

    /// 处理一帧
    pub fn process_frame(
        &mut self,
        frame_id: u64,
        region: &RegionConfig,
        frame_width: u32,
        objects: &[TrackedObject],
    ) -> FrameReport {
        let geometry = region.geometry(frame_width);
        self.evict_stale(frame_id);

        // 1. 穿越判断
        let mut events = Vec::new();
        for object in objects.iter().filter(|o| o.is_tracked()) {
            let (_, center_y) = object.center();
            if let Some(prev) = self.prev_center.get(&object.track_id) {
                for (door, line) in geometry.doors() {
                    if let Some(direction) = self.crossing(door, prev.center_y, center_y, line.y) {
                        events.push(CrossingEvent {
                            track_id: object.track_id,
                            direction,
                            door,
                            frame_id,
                        });
                    }
                }
            }
            self.prev_center.insert(
                object.track_id,
                TrackMemory {
                    center_y,
                    last_seen: frame_id,
                },
            );
        }

        for event in &events {
            match event.direction {
                Direction::In => self.state.in_events.push(event.track_id),
                Direction::Out => self.state.out_events.push(event.track_id),
            }
        }

        // 2. 累计计数
        for object in objects.iter().filter(|o| o.is_tracked()) {
            self.state.seen_ids.insert(object.track_id);
            self.state.interval_ids.insert(object.track_id);
        }

        // 3. 区间结算
        let interval_count = if self.settings.is_rollover(frame_id) {
            let count = self.state.interval_ids.len();
            self.state.interval_ids.clear();
            Some(count)
        } else {
            None
        };

        // 4. 记录
        let mut record = format!(
            "Frame id: {}, Total count: {}, In count: {}, Out count: {}",
            frame_id,
            self.state.seen_ids.len(),
            self.state.in_events.len(),
            self.state.out_events.len()
        );
        if let Some(count) = interval_count {
            record.push_str(&format!(
                ", Count during {} secs: {}",
                self.settings.interval_secs, count
            ));
        }
        self.state.records.push(record.clone());

        FrameReport {
            frame_id,
            geometry,
            events,
            interval_count,
            record,
        }
    }

    fn crossing(&self, door: Door, prev_y: f32, cur_y: f32, line_y: i32) -> Option<Direction> {
        let y = line_y as f32;
        let d = self.dead_band;
        let moved_down = prev_y <= y - d && cur_y > y + d;
        let moved_up = prev_y >= y + d && cur_y < y - d;

        match (door, moved_down, moved_up) {
            (Door::Door1, true, _) => Some(Direction::In),
            (Door::Door1, _, true) => Some(Direction::Out),
            (Door::Door2, true, _) => Some(Direction::Out),
            (Door::Door2, _, true) => Some(Direction::In),
            _ => None,
        }
    }

    fn evict_stale(&mut self, frame_id: u64) {
        if let Some(max_age) = self.evict_after {
            self.prev_center
                .retain(|_, memory| frame_id.saturating_sub(memory.last_seen) <= max_age);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Tlwh;
    use crate::region::RegionType;

    const WIDTH: u32 = 640;

    /// 中心点为 (x, y) 的 20x20 目标
    fn at(id: i64, x: f32, y: f32) -> TrackedObject {
        TrackedObject::new(id, Tlwh::new(x - 10.0, y - 10.0, 20.0, 20.0), 0.9)
    }

    fn run(
        counter: &mut EntranceCounter,
        region: RegionConfig,
        frames: &[Vec<TrackedObject>],
    ) -> Vec<FrameReport> {
        frames
            .iter()
            .enumerate()
            .map(|(i, objects)| counter.process_frame(i as u64 + 1, &region, WIDTH, objects))
            .collect()
    }

    fn counter() -> EntranceCounter {
        EntranceCounter::new(CounterSettings::default())
    }

    #[test]
    fn test_seen_set_is_monotonic() {
        let mut counter = counter();
        let region = RegionConfig::default();
        let frames = vec![
            vec![at(1, 10.0, 10.0), at(2, 20.0, 20.0)],
            vec![at(2, 20.0, 30.0)],
            vec![],
            vec![at(3, 30.0, 30.0), at(1, 10.0, 50.0)],
        ];

        let mut last = 0;
        for (i, objects) in frames.iter().enumerate() {
            counter.process_frame(i as u64 + 1, &region, WIDTH, objects);
            let total = counter.state().total_count();
            assert!(total >= last);
            last = total;
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn test_negative_ids_are_ignored() {
        let mut counter = counter();
        let region = RegionConfig::new(RegionType::Both, 100, 300);
        let frames = vec![vec![at(-1, 50.0, 50.0)], vec![at(-1, 50.0, 350.0)]];
        let reports = run(&mut counter, region, &frames);

        assert!(reports.iter().all(|r| r.events.is_empty()));
        assert_eq!(counter.state().total_count(), 0);
        assert_eq!(counter.state().in_count(), 0);
        assert_eq!(counter.state().out_count(), 0);
        assert_eq!(counter.tracked_positions(), 0);
    }

    #[test]
    fn test_first_sighting_only_records_position() {
        let mut counter = counter();
        let region = RegionConfig::new(RegionType::Upper, 100, 300);
        // 首次出现就在门线另一侧, 不算穿越
        let report = counter.process_frame(1, &region, WIDTH, &[at(5, 50.0, 150.0)]);
        assert!(report.events.is_empty());
        assert_eq!(counter.tracked_positions(), 1);
        assert_eq!(counter.state().total_count(), 1);
    }

    #[test]
    fn test_upper_mode_crossing() {
        let region = RegionConfig::new(RegionType::Upper, 100, 300);

        // 向下穿越 line1 为 IN
        let mut down = counter();
        let reports = run(
            &mut down,
            region,
            &[vec![at(1, 50.0, 50.0)], vec![at(1, 50.0, 150.0)]],
        );
        assert_eq!(reports[1].events.len(), 1);
        assert_eq!(reports[1].events[0].direction, Direction::In);
        assert_eq!(reports[1].events[0].door, Door::Door1);
        assert_eq!(down.state().in_events(), &[1]);

        // 向上穿越 line1 为 OUT
        let mut up = counter();
        run(
            &mut up,
            region,
            &[vec![at(1, 50.0, 150.0)], vec![at(1, 50.0, 50.0)]],
        );
        assert_eq!(up.state().in_count(), 0);
        assert_eq!(up.state().out_events(), &[1]);
    }

    #[test]
    fn test_under_mode_crossing() {
        let region = RegionConfig::new(RegionType::Under, 100, 300);
        let mut counter = counter();
        let reports = run(
            &mut counter,
            region,
            &[
                vec![at(1, 50.0, 350.0), at(2, 80.0, 50.0)],
                vec![at(1, 50.0, 250.0)],
                // line1 在 under 模式下不生效
                vec![at(1, 50.0, 310.0), at(2, 80.0, 150.0)],
            ],
        );
        assert_eq!(reports[1].events[0].direction, Direction::In);
        assert_eq!(reports[1].events[0].door, Door::Door2);
        assert_eq!(reports[2].events.len(), 1);
        assert_eq!(reports[2].events[0].direction, Direction::Out);
        assert_eq!(counter.state().in_count(), 1);
        assert_eq!(counter.state().out_count(), 1);
    }

    #[test]
    fn test_both_mode_opposite_lines() {
        let region = RegionConfig::new(RegionType::Both, 100, 300);

        // 同样向下移动: line1 为 IN, line2 为 OUT
        let mut counter = counter();
        let reports = run(
            &mut counter,
            region,
            &[
                vec![at(1, 50.0, 90.0), at(2, 50.0, 290.0)],
                vec![at(1, 50.0, 110.0), at(2, 50.0, 310.0)],
            ],
        );
        let events = &reports[1].events;
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].door, events[0].direction), (Door::Door1, Direction::In));
        assert_eq!((events[1].door, events[1].direction), (Door::Door2, Direction::Out));

        // 同样向上移动: line1 为 OUT, line2 为 IN
        let mut counter = EntranceCounter::new(CounterSettings::default());
        let reports = run(
            &mut counter,
            region,
            &[
                vec![at(1, 50.0, 110.0), at(2, 50.0, 310.0)],
                vec![at(1, 50.0, 90.0), at(2, 50.0, 290.0)],
            ],
        );
        let events = &reports[1].events;
        assert_eq!((events[0].door, events[0].direction), (Door::Door1, Direction::Out));
        assert_eq!((events[1].door, events[1].direction), (Door::Door2, Direction::In));
    }

    #[test]
    fn test_both_mode_one_event_per_line() {
        let region = RegionConfig::new(RegionType::Both, 100, 300);
        let mut counter = counter();
        // 一帧内跨过两条线: 两条线各自产生一次
        let reports = run(
            &mut counter,
            region,
            &[vec![at(1, 50.0, 50.0)], vec![at(1, 50.0, 350.0)]],
        );
        assert_eq!(reports[1].events.len(), 2);
        assert_eq!(counter.state().in_count(), 1);
        assert_eq!(counter.state().out_count(), 1);
    }

    #[test]
    fn test_close_never_counts() {
        let region = RegionConfig::new(RegionType::Close, 100, 300);
        let mut counter = counter();
        let frames: Vec<Vec<TrackedObject>> = [50.0, 150.0, 350.0, 50.0, 350.0]
            .iter()
            .map(|&y| vec![at(1, 50.0, y), at(2, 60.0, 400.0 - y)])
            .collect();
        let reports = run(&mut counter, region, &frames);

        assert!(reports.iter().all(|r| r.events.is_empty()));
        assert!(reports[0].geometry.is_closed());
        assert_eq!(counter.state().in_count() + counter.state().out_count(), 0);
        // 仍然统计出现的目标
        assert_eq!(counter.state().total_count(), 2);
    }

    #[test]
    fn test_no_dedup_without_dead_band() {
        let region = RegionConfig::new(RegionType::Upper, 100, 300);
        let mut counter = counter();
        // 门线附近 1 像素抖动
        let frames: Vec<Vec<TrackedObject>> = [100.0, 101.0, 99.0, 101.0]
            .iter()
            .map(|&y| vec![at(1, 50.0, y)])
            .collect();
        run(&mut counter, region, &frames);
        assert_eq!(counter.state().in_events(), &[1, 1]);
        assert_eq!(counter.state().out_events(), &[1]);
    }

    #[test]
    fn test_dead_band_suppresses_jitter() {
        let region = RegionConfig::new(RegionType::Upper, 100, 300);
        let mut counter = counter().with_dead_band(5.0);
        let frames: Vec<Vec<TrackedObject>> = [100.0, 101.0, 99.0, 101.0, 90.0, 110.0]
            .iter()
            .map(|&y| vec![at(1, 50.0, y)])
            .collect();
        run(&mut counter, region, &frames);
        assert_eq!(counter.state().in_events(), &[1]);
        assert!(counter.state().out_events().is_empty());
    }

    #[test]
    fn test_interval_rollover() {
        let settings = CounterSettings::new(30, 2);
        let rollovers: Vec<u64> = (0..=200).filter(|&f| settings.is_rollover(f)).collect();
        assert_eq!(rollovers, vec![60, 120, 180]);

        let mut counter = EntranceCounter::new(settings);
        let region = RegionConfig::default();
        for frame_id in 1..=121u64 {
            // 每帧一个新目标
            let report = counter.process_frame(
                frame_id,
                &region,
                WIDTH,
                &[at(frame_id as i64, 10.0, 10.0)],
            );
            match frame_id {
                60 | 120 => {
                    assert_eq!(report.interval_count, Some(60));
                    assert!(counter.state().interval_ids().is_empty());
                    assert!(report.record.ends_with(", Count during 2 secs: 60"));
                }
                _ => {
                    assert_eq!(report.interval_count, None);
                    assert!(!report.record.contains("Count during"));
                }
            }
        }
        assert_eq!(counter.state().interval_count(), 1);
    }

    #[test]
    fn test_zero_settings_are_clamped() {
        let settings = CounterSettings::new(0, 0);
        assert_eq!(settings.video_fps(), 1);
        assert_eq!(settings.interval_secs(), 1);
        // 每帧都是区间边界, 不会除零
        assert!((1..=5).all(|f| settings.is_rollover(f)));
        assert!(!settings.is_rollover(0));
    }

    #[test]
    fn test_repeated_frame_is_harmless() {
        let region = RegionConfig::new(RegionType::Upper, 100, 300);
        let mut counter = counter();
        let objects = vec![at(1, 50.0, 150.0)];
        // 同一帧被处理两次
        counter.process_frame(1, &region, WIDTH, &[at(1, 50.0, 50.0)]);
        let first = counter.process_frame(2, &region, WIDTH, &objects);
        let second = counter.process_frame(3, &region, WIDTH, &objects);

        assert_eq!(first.events.len(), 1);
        assert!(second.events.is_empty());
        assert_eq!(counter.state().records().len(), 3);
        assert_eq!(counter.state().in_count(), 1);
    }

    #[test]
    fn test_record_format() {
        let region = RegionConfig::new(RegionType::Upper, 100, 300);
        let mut counter = counter();
        counter.process_frame(1, &region, WIDTH, &[at(1, 50.0, 50.0), at(2, 80.0, 50.0)]);
        let report = counter.process_frame(2, &region, WIDTH, &[at(1, 50.0, 150.0)]);
        assert_eq!(
            report.record,
            "Frame id: 2, Total count: 2, In count: 1, Out count: 0"
        );
        assert_eq!(counter.state().last_record(), Some(report.record.as_str()));
    }

    #[test]
    fn test_region_switch_keeps_positions() {
        let mut counter = counter();
        let upper = RegionConfig::new(RegionType::Upper, 100, 300);
        let under = RegionConfig::new(RegionType::Under, 100, 300);

        counter.process_frame(1, &upper, WIDTH, &[at(1, 50.0, 250.0)]);
        // 切换区域类型后, 上一位置仍然有效
        let report = counter.process_frame(2, &under, WIDTH, &[at(1, 50.0, 320.0)]);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].direction, Direction::Out);
    }

    #[test]
    fn test_eviction_forgets_stale_tracks() {
        let region = RegionConfig::new(RegionType::Upper, 100, 300);
        let mut counter = counter().with_eviction(Some(5));
        counter.process_frame(1, &region, WIDTH, &[at(1, 50.0, 50.0), at(2, 50.0, 50.0)]);
        for frame_id in 2..=10 {
            counter.process_frame(frame_id, &region, WIDTH, &[at(2, 50.0, 50.0)]);
        }
        assert_eq!(counter.tracked_positions(), 1);

        // 被清理的目标再次出现视为首次出现
        let report = counter.process_frame(11, &region, WIDTH, &[at(1, 50.0, 150.0)]);
        assert!(report.events.is_empty());

        // 默认不清理
        let mut keep = EntranceCounter::new(CounterSettings::default());
        keep.process_frame(1, &region, WIDTH, &[at(1, 50.0, 50.0)]);
        keep.process_frame(1000, &region, WIDTH, &[]);
        assert_eq!(keep.tracked_positions(), 1);
    }

    /// 四帧场景: 中心点 160 → 140 → 110 → 90, line1 = 100
    fn scenario(region_type: RegionType) -> Vec<FrameReport> {
        let region = RegionConfig::new(region_type, 100, 100);
        let mut counter = counter();
        let frames: Vec<Vec<TrackedObject>> = [160.0, 140.0, 110.0, 90.0]
            .iter()
            .map(|&y| vec![at(7, 50.0, y)])
            .collect();
        run(&mut counter, region, &frames)
    }

    #[test]
    fn test_upward_scenario() {
        for region_type in [RegionType::Upper, RegionType::Under] {
            let reports = scenario(region_type);
            assert!(reports[..3].iter().all(|r| r.events.is_empty()));
            assert_eq!(reports[3].events.len(), 1);
            assert_eq!(reports[3].events[0].track_id, 7);
            assert_eq!(reports[3].events[0].frame_id, 4);
        }

        // 向上穿越: upper 模式记为 OUT, under 模式记为 IN
        assert_eq!(scenario(RegionType::Upper)[3].events[0].direction, Direction::Out);
        assert_eq!(scenario(RegionType::Under)[3].events[0].direction, Direction::In);
        assert!(scenario(RegionType::Close).iter().all(|r| r.events.is_empty()));
    }
}

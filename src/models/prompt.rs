/// 一次 LLM 调用的完整输入
///
/// 每个任务现场组装，不缓存、不复用。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// 图片（data URI 或 URL），通过 Vision 接口附加到用户消息
    pub images: Vec<String>,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

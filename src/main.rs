use anyhow::Result;
use log::info;
use ndarray::s;
use ndarray_rand::rand::thread_rng;

mod config;
mod mnist;
mod model;
mod optim;
mod persist;
mod preprocess;
mod train;

use config::TrainingConfig;
use model::SoftmaxClassifier;
use train::{Trainer, argmax, evaluate};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = TrainingConfig::default();
    config.validate()?;
    let mut rng = thread_rng();

    let data = mnist::load(&config.data_dir)?;
    info!(
        "loaded {} training and {} test images, raw shape {:?}",
        data.train.len(),
        data.test.len(),
        data.train.images.dim()
    );

    let train_set = preprocess::prepare(&data.train, config.image_side, config.classes)?;
    let test_set = preprocess::prepare(&data.test, config.image_side, config.classes)?;
    info!(
        "preprocessed inputs: train {:?}, test {:?}",
        train_set.inputs.dim(),
        test_set.inputs.dim()
    );

    let mut model = SoftmaxClassifier::new(config.input_len(), config.classes, &mut rng);
    let mut trainer = Trainer::new(config.clone(), &model);
    let reports = trainer.fit(&mut model, &train_set, &mut rng);
    if let Some(last) = reports.last() {
        info!(
            "finished epoch {} with training loss {:.4}, accuracy {:.4}",
            last.epoch, last.loss, last.accuracy
        );
    }

    let metrics = evaluate(&model, &test_set);
    info!(
        "test loss {:.4}, test accuracy {:.4}",
        metrics.loss, metrics.accuracy
    );

    persist::save(&model, &config.weights_path)?;
    info!("saved weights to {}", config.weights_path.display());

    // Reload through the same path a later consumer would use and spot-check
    // the first few test digits against their labels.
    let restored = persist::load(&config.weights_path)?;
    let count = test_set.len().min(5);
    let probs = restored.probabilities(&test_set.inputs.slice(s![..count, ..]).to_owned());
    for (row, &label) in probs.rows().into_iter().zip(test_set.labels.iter()) {
        info!("predicted {} (true label {})", argmax(row), label);
    }

    Ok(())
}

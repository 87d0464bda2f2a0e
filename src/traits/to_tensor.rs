use burn::{
    prelude::*,
    tensor::{backend::Backend, TensorData},
};

/// A trait for converting host-side batches to float tensors
///
/// Implemented for `Vec<f32>` (1D) and row-major `Vec<Vec<f32>>` (2D, one row per batch
/// item). Values are converted to the backend's float element.
pub trait ToTensor<B: Backend, const D: usize> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D>;
}

impl<B: Backend> ToTensor<B, 1> for Vec<f32> {
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 1> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]).convert::<B::FloatElem>(), device)
    }
}

impl<B: Backend> ToTensor<B, 2> for Vec<Vec<f32>> {
    /// # Panics
    /// If the rows do not all have the same length.
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2> {
        let batch_size = self.len();
        let width = self.first().map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(batch_size * width);
        for row in self.iter() {
            assert_eq!(row.len(), width, "ragged batch: every row must have {width} columns");
            flat.extend_from_slice(row);
        }

        Tensor::from_data(
            TensorData::new(flat, [batch_size, width]).convert::<B::FloatElem>(),
            device,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_vec_f32_to_tensor_1d() {
        let device = NdArrayDevice::default();
        let data = vec![1.0_f32, 2.0, 3.0, 4.0];
        let tensor: Tensor<NdArray, 1> = data.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [4]);
        let tensor_data = tensor.to_data();
        assert_eq!(tensor_data.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rows_to_tensor_2d() {
        let device = NdArrayDevice::default();

        let observations = vec![vec![1.0_f32, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tensor: Tensor<NdArray, 2> = observations.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [3, 2]);
        let tensor_data = tensor.to_data();
        assert_eq!(
            tensor_data.as_slice::<f32>().unwrap(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    #[should_panic(expected = "ragged batch")]
    fn test_ragged_rows_panic() {
        let device = NdArrayDevice::default();
        let rows = vec![vec![1.0_f32, 2.0], vec![3.0]];
        let _: Tensor<NdArray, 2> = rows.to_tensor(&device);
    }
}
